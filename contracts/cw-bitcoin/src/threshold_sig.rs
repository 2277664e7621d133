use bitcoin::blockdata::transaction::EcdsaSighashType;
use bitcoin::secp256k1::{
    self,
    constants::{MESSAGE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa, PublicKey,
};
use cosmwasm_schema::cw_serde;
use cosmwasm_schema::serde::{Deserialize, Serialize};
use cosmwasm_std::Api;

use crate::error::{ContractError, ContractResult};
use crate::signatory::SignatorySet;

/// A sighash to be signed by a set of signatories (spec §4.F, BIP-143).
pub type Message = [u8; MESSAGE_SIZE];

/// A compact (64-byte `r || s`) secp256k1 ECDSA signature, the format
/// `cosmwasm_std::Api::secp256k1_verify` expects. Converted to DER with a
/// trailing sighash-type byte only when assembling the witness, see
/// `to_witness`.
#[cw_serde]
pub struct Signature(#[serde(serialize_with = "<[_]>::serialize")] pub Vec<u8>);

/// A compressed secp256k1 public key (spec §3 "Signatory").
#[derive(Clone, Debug, PartialOrd, PartialEq, Eq, Ord, Deserialize, Serialize, cosmwasm_schema::schemars::JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct Pubkey {
    #[serde(serialize_with = "<[_]>::serialize")]
    bytes: Vec<u8>,
}

impl Default for Pubkey {
    fn default() -> Self {
        Pubkey {
            bytes: [0; PUBLIC_KEY_SIZE].to_vec(),
        }
    }
}

impl Pubkey {
    /// Creates a pubkey from compressed secp256k1 public key bytes, failing if
    /// they do not decode to a valid curve point.
    pub fn new(pubkey: [u8; PUBLIC_KEY_SIZE]) -> ContractResult<Self> {
        secp256k1::PublicKey::from_slice(pubkey.as_slice())
            .map_err(|_| ContractError::BadFormat("invalid secp256k1 public key".into()))?;

        Ok(Pubkey {
            bytes: pubkey.to_vec(),
        })
    }

    pub fn try_from_slice(bytes: &[u8]) -> ContractResult<Self> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(ContractError::BadFormat(format!(
                "expected a {}-byte public key, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }

        let mut buf = [0; PUBLIC_KEY_SIZE];
        buf.copy_from_slice(bytes);

        Self::new(buf)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<PublicKey> for Pubkey {
    fn from(pubkey: PublicKey) -> Self {
        Pubkey {
            bytes: pubkey.serialize().to_vec(),
        }
    }
}

/// Coordinates the collection of per-signatory signatures over a single
/// message (in practice, one Bitcoin input's sighash).
///
/// Populated from a `SignatorySet` at the moment a `SigningTx` is frozen; the
/// order of `sigs` mirrors the order of `signatories` in that set, so a
/// `signatory_index` from an admitted `Signature` transaction (spec §4.F)
/// indexes directly into it.
#[derive(Default, Serialize, Deserialize, Clone, PartialEq, cosmwasm_schema::schemars::JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct ThresholdSig {
    /// The cumulative voting power required for the message to be considered
    /// signed.
    pub threshold: u64,
    /// The total voting power of signatories who have signed so far.
    pub signed: u64,
    /// The message being signed.
    pub message: Message,
    /// A (pubkey, share) entry per signatory, in signatory-set order.
    pub sigs: Vec<(Pubkey, Share)>,
}

impl ThresholdSig {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.sigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sigs.is_empty()
    }

    pub fn set_message(&mut self, message: Message) {
        self.message = message;
    }

    pub fn message(&self) -> Message {
        self.message
    }

    /// Populates the set of signers from a frozen `SignatorySet`, with an
    /// empty message (filled in later via `set_message` once the owning
    /// transaction's structure is final).
    pub fn from_sigset(signatories: &SignatorySet) -> Self {
        let mut ts = ThresholdSig::default();

        for signatory in signatories.iter() {
            ts.sigs.push((
                signatory.pubkey.clone(),
                Share {
                    power: signatory.voting_power,
                    sig: None,
                },
            ));
        }

        ts.threshold = signatories.signature_threshold();

        ts
    }

    /// Whether the cumulative voting power of submitted signatures has
    /// reached or exceeded the threshold (spec §4.F: "reaches or exceeds the
    /// threshold").
    pub fn signed(&self) -> bool {
        self.signed >= self.threshold
    }

    /// Verifies and records a signature from the signatory at `index`.
    ///
    /// Fails `BadIndex` if out of range, `AlreadySigned` if that signatory
    /// has already submitted for this message, and `BadSignature` if the
    /// signature does not verify against the signatory's committed pubkey.
    pub fn sign(&mut self, api: &dyn Api, index: u32, sig: &Signature) -> ContractResult<()> {
        let (pubkey, share) = self
            .sigs
            .get_mut(index as usize)
            .ok_or(ContractError::BadIndex(index))?;

        if share.sig.is_some() {
            return Err(ContractError::AlreadySigned);
        }

        Self::secp_verify(api, self.message.as_slice(), pubkey, sig)?;

        share.sig = Some(sig.clone());
        self.signed += share.power;

        Ok(())
    }

    pub fn secp_verify(
        api: &dyn Api,
        msg: &[u8],
        pubkey: &Pubkey,
        sig: &Signature,
    ) -> ContractResult<()> {
        let verified = api.secp256k1_verify(msg, &sig.0, pubkey.as_slice())?;

        if !verified {
            return Err(ContractError::BadSignature);
        }

        Ok(())
    }

    /// Returns the DER-encoded (plus sighash-type byte) signatures, in the
    /// order they must be pushed onto the witness stack: the exact reverse
    /// of `sigs`' order, since the script's first `CHECKSIG` consumes the
    /// *last* witness item pushed (spec §4.F, §4.B). This must mirror
    /// `signatory::SignatorySet::sort_and_truncate`'s order precisely —
    /// re-deriving it from a different sort key (e.g. pubkey bytes) would
    /// put a signature at the wrong stack slot whenever two signatories tie
    /// on voting power. Missing signatures serialize as empty pushes
    /// (`OP_0`).
    pub fn to_witness(&self) -> ContractResult<Vec<Vec<u8>>> {
        if !self.signed() {
            return Ok(vec![]);
        }

        self.sigs
            .iter()
            .rev()
            .map(|(_, share)| {
                share.sig.clone().map_or(Ok(vec![]), |sig| {
                    let sig = ecdsa::Signature::from_compact(&sig.0)?;
                    let mut v = sig.serialize_der().to_vec();
                    v.push(EcdsaSighashType::All.to_u32() as u8);
                    Ok(v)
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for ThresholdSig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdSig")
            .field("threshold", &self.threshold)
            .field("signed", &self.signed)
            .field("len", &self.sigs.len())
            .finish()
    }
}

/// A signatory's voting power and signature state within a `ThresholdSig`.
#[cw_serde]
pub struct Share {
    pub power: u64,
    pub(super) sig: Option<Signature>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatory::Signatory;
    use cosmwasm_std::testing::mock_dependencies;

    fn test_sigset() -> (SignatorySet, Vec<secp256k1::SecretKey>, Vec<Pubkey>) {
        let secp = secp256k1::Secp256k1::new();
        let mut sigset = SignatorySet::default();
        let mut sks = vec![];
        let mut pks = vec![];

        for (i, vp) in [30u64, 20, 10].into_iter().enumerate() {
            let sk = secp256k1::SecretKey::from_slice(&[i as u8 + 1; 32]).unwrap();
            let pk: Pubkey = secp256k1::PublicKey::from_secret_key(&secp, &sk).into();
            sks.push(sk);
            pks.push(pk.clone());
            sigset.insert(Signatory {
                voting_power: vp,
                pubkey: pk,
                consensus_key: [i as u8 + 1; 32],
            });
        }

        (sigset, sks, pks)
    }

    #[test]
    fn threshold_requires_reaching_exactly_the_ratio() {
        let (sigset, ..) = test_sigset();
        // total vp = 60, threshold = ceil(2*60/3) = 40
        assert_eq!(sigset.signature_threshold(), 40);

        let mut ts = ThresholdSig::from_sigset(&sigset);
        ts.set_message([7u8; MESSAGE_SIZE]);
        assert!(!ts.signed());

        ts.signed = 30;
        assert!(!ts.signed());
        ts.signed = 40;
        assert!(ts.signed());
    }

    #[test]
    fn sign_rejects_bad_index_and_double_signing() {
        let deps = mock_dependencies();
        let (sigset, sks, _) = test_sigset();
        let mut ts = ThresholdSig::from_sigset(&sigset);
        let msg = [9u8; MESSAGE_SIZE];
        ts.set_message(msg);

        let secp = secp256k1::Secp256k1::new();
        let sig = secp.sign_ecdsa(
            &secp256k1::Message::from_slice(&msg).unwrap(),
            &sks[0],
        );
        let sig = Signature(sig.serialize_compact().to_vec());

        assert!(matches!(
            ts.sign(deps.as_ref().api, 99, &sig),
            Err(ContractError::BadIndex(99))
        ));

        ts.sign(deps.as_ref().api, 0, &sig).unwrap();
        assert!(matches!(
            ts.sign(deps.as_ref().api, 0, &sig),
            Err(ContractError::AlreadySigned)
        ));
    }

    #[test]
    fn witness_order_is_exact_reverse_of_script_order() {
        let (sigset, sks, _) = test_sigset();
        let mut ts = ThresholdSig::from_sigset(&sigset);
        let msg = [1u8; MESSAGE_SIZE];
        ts.set_message(msg);

        let deps = mock_dependencies();
        let secp = secp256k1::Secp256k1::new();
        let mut expected_order = vec![];
        for (i, sk) in sks.iter().enumerate() {
            let sig = secp.sign_ecdsa(&secp256k1::Message::from_slice(&msg).unwrap(), sk);
            let sig = sig.serialize_compact().to_vec();
            ts.sign(deps.as_ref().api, i as u32, &Signature(sig.clone()))
                .unwrap();
            expected_order.push(sig);
        }

        let witness = ts.to_witness().unwrap();
        assert_eq!(witness.len(), 3);
        // signatories were pushed in script order (vp 30, 20, 10); the
        // witness must carry their signatures in the exact reverse.
        for (w, expected_sig) in witness.iter().zip(expected_order.iter().rev()) {
            let decoded = ecdsa::Signature::from_der(&w[..w.len() - 1]).unwrap();
            assert_eq!(decoded.serialize_compact().to_vec(), *expected_sig);
        }
    }
}
