use bitcoin::blockdata::opcodes::all::{
    OP_ADD, OP_CHECKSIG, OP_ELSE, OP_ENDIF, OP_GREATERTHAN, OP_IF, OP_SWAP,
};
use bitcoin::Script;
use bitcoin_script::bitcoin_script as script;
use cosmwasm_schema::serde::{Deserialize, Serialize};

use crate::constants::{MAX_SIGNATORIES, SIGSET_THRESHOLD};
use crate::error::ContractError;
use crate::error::ContractResult;
use crate::interface::Validator;
use crate::threshold_sig::Pubkey;

/// A signatory in a signatory set: a validator that has committed a
/// secp256k1 key, carrying its voting power (spec §3 "Signatory").
#[derive(Clone, Debug, PartialOrd, PartialEq, Eq, Ord, Deserialize, Serialize, cosmwasm_schema::schemars::JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct Signatory {
    pub voting_power: u64,
    pub pubkey: Pubkey,
    /// The signatory's ed25519 consensus key, carried only to break ties
    /// deterministically at freeze time (spec §3, §4.A) — never used at
    /// script-spend time.
    pub consensus_key: [u8; 32],
}

/// An ordered, frozen set of signatories secured by a weighted threshold
/// script (spec §3 "Signatory set").
///
/// Invariants upheld by construction: sorted by descending voting power with
/// ties broken by descending consensus-key byte order (§4.A); length at most
/// `MAX_SIGNATORIES`.
#[derive(Clone, Debug, PartialOrd, PartialEq, Eq, Ord, Deserialize, Serialize, cosmwasm_schema::schemars::JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct SignatorySet {
    /// The time at which this set was created (seconds since epoch).
    pub create_time: u64,
    /// Total voting power of signatories actually included in this set (i.e.
    /// validators who had committed a secp256k1 key at freeze time).
    pub present_vp: u64,
    /// Total voting power of the full validator map at freeze time,
    /// including validators who had not yet committed a key.
    pub possible_vp: u64,
    /// Monotonically increasing index identifying this set.
    pub index: u32,
    /// `(numerator, denominator)` ratio this set's signature threshold was
    /// computed with at freeze time, so a later change to `PegConfig`
    /// doesn't retroactively change an already-published script.
    pub threshold_ratio: (u64, u64),
    /// The signatories, sorted by descending voting power.
    pub signatories: Vec<Signatory>,
}

impl Default for SignatorySet {
    fn default() -> Self {
        SignatorySet {
            create_time: 0,
            present_vp: 0,
            possible_vp: 0,
            index: 0,
            threshold_ratio: SIGSET_THRESHOLD,
            signatories: vec![],
        }
    }
}

impl SignatorySet {
    /// Builds a signatory set from the current validator map and committed
    /// key registry (spec §4.A selector, run whenever §4.G rotation checks
    /// for a change).
    ///
    /// `sig_key` maps a validator's consensus key to its committed
    /// secp256k1 pubkey; validators missing an entry are excluded from the
    /// resulting set (they contribute to `possible_vp` but not `present_vp`).
    /// `max_signatories`/`threshold_ratio` come from `PegConfig` so an
    /// operator can retune them without a code change.
    pub fn from_validators<'a>(
        validators: impl IntoIterator<Item = &'a Validator>,
        sig_key: impl Fn(&[u8; 32]) -> Option<Pubkey>,
        create_time: u64,
        index: u32,
        max_signatories: u64,
        threshold_ratio: (u64, u64),
    ) -> Self {
        let mut sigset = SignatorySet {
            create_time,
            present_vp: 0,
            possible_vp: 0,
            index,
            threshold_ratio,
            signatories: vec![],
        };

        for validator in validators {
            sigset.possible_vp += validator.power;

            if let Some(pubkey) = sig_key(&validator.pubkey) {
                sigset.insert(Signatory {
                    voting_power: validator.power,
                    pubkey,
                    consensus_key: validator.pubkey,
                });
            }
        }

        sigset.sort_and_truncate(max_signatories);

        sigset
    }

    pub(crate) fn insert(&mut self, signatory: Signatory) {
        self.present_vp += signatory.voting_power;
        self.signatories.push(signatory);
    }

    /// Sorts by `(-voting_power, -consensus_key)` and truncates to
    /// `MAX_SIGNATORIES` (spec §3, §4.A). The tie-break key is the
    /// signatory's consensus key, not its committed secp256k1 pubkey, so
    /// this reproduces the exact order of the selector's own output
    /// (§4.A) — the order `signatory_index` is defined against in both the
    /// key registry (§4.C) and the signing coordinator (§4.F).
    fn sort_and_truncate(&mut self, max_signatories: u64) {
        self.signatories.sort_by(|a, b| {
            b.voting_power
                .cmp(&a.voting_power)
                .then(b.consensus_key.cmp(&a.consensus_key))
        });

        if self.signatories.len() as u64 > max_signatories {
            for removed in self.signatories.drain(max_signatories as usize..) {
                self.present_vp -= removed.voting_power;
            }
        }
    }

    /// The cumulative voting power required to finalize a signature over
    /// this set: `ceil(present_vp * ratio)`, where `ratio` is the
    /// `threshold_ratio` this set was frozen with (spec §3, §4.A — `2/3` by
    /// default).
    pub fn signature_threshold(&self) -> u64 {
        self.signature_threshold_with_ratio(self.threshold_ratio)
    }

    pub fn signature_threshold_with_ratio(&self, (numerator, denominator): (u64, u64)) -> u64 {
        let vp = self.present_vp as u128;
        let num = numerator as u128;
        let den = denominator as u128;
        (((vp * num) + den - 1) / den) as u64
    }

    /// The voting-power quorum a signatory set must clear to be operationally
    /// safe to use for custody, diagnostic only (does not affect the script
    /// threshold computed above).
    pub fn quorum_threshold(&self) -> u64 {
        self.possible_vp / 2
    }

    pub fn has_quorum(&self) -> bool {
        self.present_vp >= self.quorum_threshold()
    }

    pub fn present_vp(&self) -> u64 {
        self.present_vp
    }

    pub fn possible_vp(&self) -> u64 {
        self.possible_vp
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.signatories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatories.is_empty()
    }

    pub fn create_time(&self) -> u64 {
        self.create_time
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signatory> {
        self.signatories.iter()
    }

    /// Builds the weighted-threshold witness script of spec §4.B:
    ///
    /// ```text
    /// <pk0> CHECKSIG IF <vp0> ELSE 0 ENDIF
    /// SWAP <pk1> CHECKSIG IF <vp1> ADD ENDIF
    /// ...
    /// <threshold> GREATERTHAN
    /// ```
    ///
    /// Voting power values are truncated to 23 bits of precision before
    /// encoding, keeping the minimal-length integer pushes small; this does
    /// not change which branch of the script is satisfied relative to the
    /// (equally truncated) threshold.
    pub fn redeem_script(&self) -> ContractResult<Script> {
        if self.present_vp == 0 {
            return Err(ContractError::EmptySignatorySet);
        }

        let truncation = self.get_truncation(23);

        let mut iter = self.signatories.iter();

        let first = iter.next().ok_or(ContractError::EmptySignatorySet)?;
        let vp = first.voting_power >> truncation;
        let built = script! {
            <first.pubkey.as_slice()> OP_CHECKSIG
            OP_IF
                <vp as i64>
            OP_ELSE
                0
            OP_ENDIF
        };
        let mut bytes = built.into_bytes();

        for signatory in iter {
            let vp = signatory.voting_power >> truncation;
            let built = script! {
                OP_SWAP
                <signatory.pubkey.as_slice()> OP_CHECKSIG
                OP_IF
                    <vp as i64> OP_ADD
                OP_ENDIF
            };
            bytes.extend(&built.into_bytes());
        }

        let truncated_threshold = self.signature_threshold() >> truncation;
        let built = script! {
            <truncated_threshold as i64> OP_GREATERTHAN
        };
        bytes.extend(&built.into_bytes());

        Ok(bytes.into())
    }

    /// The P2WSH output script (the hash of `redeem_script`) — this is what
    /// deposits pay to, and what the change output of a disbursal pays back
    /// to (spec §3 "P2SS address", §4.B).
    pub fn output_script(&self) -> ContractResult<Script> {
        Ok(self.redeem_script()?.to_v0_p2wsh())
    }

    /// The bech32 P2WSH address for this set on the given network.
    pub fn address(&self, network: bitcoin::Network) -> ContractResult<bitcoin::Address> {
        let script = self.output_script()?;
        bitcoin::Address::from_script(&script, network).map_err(|_| {
            ContractError::BadFormat("failed to derive address from output script".into())
        })
    }

    fn get_truncation(&self, target_precision: u32) -> u32 {
        if self.present_vp == 0 {
            return 0;
        }
        let vp_bits = u64::BITS - self.present_vp.leading_zeros();
        vp_bits.saturating_sub(target_precision)
    }

    /// Worst-case estimated witness size (all signatories present), in
    /// virtual bytes, used by the disbursal builder's fee estimate.
    pub fn est_witness_vsize(&self) -> u64 {
        self.signatories.len() as u64 * 79 + 39
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(pubkey: [u8; 32], power: u64) -> Validator {
        Validator { pubkey, power }
    }

    fn key(byte: u8) -> Pubkey {
        let sk = bitcoin::secp256k1::SecretKey::from_slice(&[byte.max(1); 32]).unwrap();
        let secp = bitcoin::secp256k1::Secp256k1::new();
        bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &sk).into()
    }

    #[test]
    fn selector_sorts_by_descending_power_then_key() {
        let v1 = validator([1; 32], 5);
        let v2 = validator([2; 32], 5);
        let validators = vec![v1, v2];
        let keys = [([1u8; 32], key(1)), ([2u8; 32], key(2))];

        let sigset = SignatorySet::from_validators(
            &validators,
            |pk| keys.iter().find(|(k, _)| k == pk).map(|(_, v)| v.clone()),
            0,
            0,
            MAX_SIGNATORIES,
            SIGSET_THRESHOLD,
        );

        // E6: tie-break on consensus key byte-lex, descending — [2;32] > [1;32].
        assert_eq!(sigset.signatories[0].pubkey, keys[1].1);
        assert_eq!(sigset.signatories[1].pubkey, keys[0].1);
    }

    #[test]
    fn selector_truncates_to_max_signatories() {
        let mut validators = vec![];
        let mut keys = vec![];
        for i in 0..(MAX_SIGNATORIES + 10) {
            let pk = [(i % 250) as u8; 32];
            validators.push(validator(pk, MAX_SIGNATORIES + 10 - i));
            keys.push((pk, key((i % 250) as u8)));
        }

        let sigset = SignatorySet::from_validators(
            &validators,
            |pk| keys.iter().find(|(k, _)| k == pk).map(|(_, v)| v.clone()),
            0,
            0,
            MAX_SIGNATORIES,
            SIGSET_THRESHOLD,
        );

        assert_eq!(sigset.len() as u64, MAX_SIGNATORIES);
    }

    #[test]
    fn empty_signatory_set_rejects_script_emission() {
        let sigset = SignatorySet::default();
        assert!(matches!(
            sigset.redeem_script(),
            Err(ContractError::EmptySignatorySet)
        ));
    }

    #[test]
    fn all_zero_voting_power_rejects_script_emission() {
        let mut sigset = SignatorySet::default();
        sigset.insert(Signatory {
            voting_power: 0,
            pubkey: key(1),
            consensus_key: [1; 32],
        });
        assert!(matches!(
            sigset.redeem_script(),
            Err(ContractError::EmptySignatorySet)
        ));
    }

    #[test]
    fn threshold_is_ceiling_of_two_thirds() {
        let mut sigset = SignatorySet::default();
        sigset.insert(Signatory {
            voting_power: 10,
            pubkey: key(1),
            consensus_key: [1; 32],
        });
        // ceil(2*10/3) = 7
        assert_eq!(sigset.signature_threshold(), 7);
    }
}
