use bitcoin::blockdata::transaction::EcdsaSighashType;
use bitcoin::{OutPoint, Sequence, Transaction, TxIn};
use common_bitcoin::adapter::Adapter;
use cosmwasm_schema::serde::{Deserialize, Serialize};
use cosmwasm_std::Api;

use crate::error::{ContractError, ContractResult};
use crate::signatory::SignatorySet;
use crate::threshold_sig::{Signature, ThresholdSig};

/// A Bitcoin transaction output, paired with the satoshi amount it carries.
pub type Output = Adapter<bitcoin::TxOut>;

/// One input of a `SigningTx`: the UTXO being spent, the scripts needed to
/// spend it, and the in-progress per-signatory signature table for its
/// sighash (spec §3 "SigningTx", §4.F).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, cosmwasm_schema::schemars::JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct Input {
    pub prevout: Adapter<OutPoint>,
    pub script_pubkey: Adapter<bitcoin::Script>,
    pub redeem_script: Adapter<bitcoin::Script>,
    /// The index of the signatory set this input's UTXO is secured by.
    pub sigset_index: u32,
    pub amount: u64,
    pub est_witness_vsize: u64,
    pub signatures: ThresholdSig,
}

impl Input {
    pub fn new(prevout: OutPoint, sigset: &SignatorySet, amount: u64) -> ContractResult<Self> {
        Ok(Input {
            prevout: Adapter::new(prevout),
            script_pubkey: Adapter::new(sigset.output_script()?),
            redeem_script: Adapter::new(sigset.redeem_script()?),
            sigset_index: sigset.index(),
            amount,
            est_witness_vsize: sigset.est_witness_vsize(),
            signatures: ThresholdSig::from_sigset(sigset),
        })
    }

    /// Converts to a `bitcoin::TxIn`, assembling the witness stack in the
    /// order spec §4.F requires: ascending by voting power (the reverse of
    /// script position), with the redeem script appended last.
    pub fn to_txin(&self) -> ContractResult<TxIn> {
        let mut witness = self.signatures.to_witness()?;
        if self.signatures.signed() {
            witness.push(self.redeem_script.to_bytes());
        }

        Ok(TxIn {
            previous_output: *self.prevout,
            script_sig: bitcoin::Script::new(),
            sequence: Sequence(u32::MAX),
            witness: bitcoin::Witness::from_vec(witness),
        })
    }

    /// Estimated size of this input once fully signed, in virtual bytes:
    /// the non-witness outpoint/sequence overhead plus the worst-case
    /// witness size for its signatory set.
    pub fn est_vsize(&self) -> u64 {
        self.est_witness_vsize + 40
    }
}

/// The in-progress (or just-finalized) disbursal transaction (spec §3
/// "SigningTx"). Lives in the `SIGNING_TX` slot while `pending`; once every
/// input reaches its threshold it is moved into `SIGNED_TX` as a plain
/// `bitcoin::Transaction` and `SIGNING_TX` is cleared (spec §4.F).
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq, cosmwasm_schema::schemars::JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct SigningTx {
    pub lock_time: u32,
    pub input: Vec<Input>,
    pub output: Vec<Output>,
}

impl SigningTx {
    pub fn to_bitcoin_tx(&self) -> ContractResult<Transaction> {
        Ok(Transaction {
            version: 1,
            lock_time: bitcoin::PackedLockTime(self.lock_time),
            input: self
                .input
                .iter()
                .map(Input::to_txin)
                .collect::<ContractResult<_>>()?,
            output: self.output.iter().map(|o| o.clone().into_inner()).collect(),
        })
    }

    /// Whether every input has reached its signing threshold.
    pub fn signed(&self) -> bool {
        !self.input.is_empty() && self.input.iter().all(|i| i.signatures.signed())
    }

    /// Computes and stores the BIP-143 sighash for every input, against the
    /// transaction's current (frozen) structure. Must be called once the
    /// transaction's inputs/outputs are final and before any signatures are
    /// admitted (spec §4.F).
    pub fn populate_sighashes(&mut self) -> ContractResult<()> {
        let bitcoin_tx = self.to_bitcoin_tx()?;
        let mut cache = bitcoin::util::sighash::SighashCache::new(&bitcoin_tx);

        for (i, input) in self.input.iter_mut().enumerate() {
            let sighash = cache.segwit_signature_hash(
                i,
                &input.redeem_script,
                input.amount,
                EcdsaSighashType::All,
            )?;
            input.signatures.set_message(sighash.into_inner());
        }

        Ok(())
    }

    /// Admits a signature from the signatory at `signatory_index` for every
    /// input of this transaction (spec §4.F: "a signatory submits
    /// `(signatory_index, signatures[0..n_inputs])`").
    pub fn sign(
        &mut self,
        api: &dyn Api,
        signatory_index: u32,
        signatures: &[Signature],
    ) -> ContractResult<()> {
        if signatures.len() != self.input.len() {
            return Err(ContractError::BadFormat(format!(
                "expected {} signatures, got {}",
                self.input.len(),
                signatures.len()
            )));
        }

        for (input, sig) in self.input.iter_mut().zip(signatures) {
            input.signatures.sign(api, signatory_index, sig)?;
        }

        Ok(())
    }
}

/// Estimates the virtual size of a disbursal transaction before it is fully
/// signed, for the fixed fee-floor policy of spec §4.E / §9. Sums each
/// input's worst-case signed size plus a conservative per-output encoding
/// cost; avoids depending on live mempool fee estimation.
pub fn estimate_vsize(inputs: &[Input], outputs: &[Output]) -> u64 {
    const TX_OVERHEAD_VBYTES: u64 = 11;
    const OUTPUT_OVERHEAD_BYTES: u64 = 9; // 8-byte amount + compact-size script length

    let input_vsize: u64 = inputs.iter().map(Input::est_vsize).sum();
    let output_vsize: u64 = outputs
        .iter()
        .map(|o| OUTPUT_OVERHEAD_BYTES + o.script_pubkey.len() as u64)
        .sum();

    TX_OVERHEAD_VBYTES + input_vsize + output_vsize
}

/// Builds the unsigned disbursal transaction for a batch of withdrawals
/// (spec §4.E). `inputs` are the UTXOs being spent (already bound to their
/// owning signatory sets via `Input::new`); `user_outputs` are the queued
/// withdrawal outputs in submission order; `change_sigset` is the current
/// signatory set, whose P2SS script receives the change output.
pub fn build_disbursal(
    inputs: Vec<Input>,
    user_outputs: Vec<(bitcoin::Script, u64)>,
    change_sigset: &SignatorySet,
    min_relay_fee: u64,
) -> ContractResult<SigningTx> {
    let total_in: u64 = inputs.iter().map(|i| i.amount).sum();

    let mut remaining = total_in as i64;
    for (_, amount) in &user_outputs {
        remaining -= *amount as i64;
        if remaining <= 0 {
            return Err(ContractError::InsufficientFunds);
        }
    }
    let change_amount = remaining as u64;

    let mut outputs: Vec<Output> = user_outputs
        .iter()
        .map(|(script, amount)| Adapter::new(bitcoin::TxOut {
            script_pubkey: script.clone(),
            value: *amount,
        }))
        .collect();
    outputs.push(Adapter::new(bitcoin::TxOut {
        script_pubkey: change_sigset.output_script()?,
        value: change_amount,
    }));

    let fee = std::cmp::max(estimate_vsize(&inputs, &outputs), min_relay_fee);
    let n_user_outputs = user_outputs.len() as u64;
    if n_user_outputs == 0 {
        return Err(ContractError::InsufficientFunds);
    }
    let fee_per = (fee + n_user_outputs - 1) / n_user_outputs;

    for output in outputs.iter_mut().take(user_outputs.len()) {
        if output.value <= fee_per {
            return Err(ContractError::OutputBelowFee);
        }
        output.value -= fee_per;
    }

    Ok(SigningTx {
        lock_time: 0,
        input: inputs,
        output: outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatory::Signatory;
    use crate::threshold_sig::Pubkey;

    fn sigset_with_one_signatory() -> SignatorySet {
        let mut sigset = SignatorySet::default();
        let sk = bitcoin::secp256k1::SecretKey::from_slice(&[9u8; 32]).unwrap();
        let secp = bitcoin::secp256k1::Secp256k1::new();
        let pk: Pubkey = bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &sk).into();
        sigset.insert(Signatory {
            voting_power: 10,
            pubkey: pk,
            consensus_key: [9; 32],
        });
        sigset
    }

    fn dummy_input(sigset: &SignatorySet, amount: u64) -> Input {
        let prevout = OutPoint::new(bitcoin::Txid::all_zeros(), 0);
        Input::new(prevout, sigset, amount).unwrap()
    }

    use bitcoin::hashes::Hash;

    #[test]
    fn e4_insufficient_funds_with_no_room_for_change_or_fee() {
        let sigset = sigset_with_one_signatory();
        let input = dummy_input(&sigset, 10_000);
        let outputs = vec![(bitcoin::Script::new(), 10_000)];

        let result = build_disbursal(vec![input], outputs, &sigset, 1000);
        assert!(matches!(result, Err(ContractError::InsufficientFunds)));
    }

    #[test]
    fn fee_conservation_holds() {
        let sigset = sigset_with_one_signatory();
        let input = dummy_input(&sigset, 1_000_000);
        let outputs = vec![(bitcoin::Script::new(), 500_000)];

        let tx = build_disbursal(vec![input], outputs, &sigset, 1000).unwrap();
        let total_in = 1_000_000u64;
        let total_out: u64 = tx.output.iter().map(|o| o.value).sum();
        assert!(total_out < total_in);
        let fee_paid = total_in - total_out;
        assert!(fee_paid >= 1000);
    }
}
