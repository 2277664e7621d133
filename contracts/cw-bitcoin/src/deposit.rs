use bitcoin::util::merkleblock::PartialMerkleTree;
use bitcoin::Transaction;
use cosmwasm_std::Storage;
use light_client_bitcoin::HeaderQueue;

use crate::config::PegConfig;
use crate::error::{ContractError, ContractResult};
use crate::interface::Dest;
use crate::rotation::sigset_for_address;
use crate::state::{Utxo, CURRENT_ADDRESS, PROCESSED_TXS, SIGSET_HISTORY, UTXOS};

/// A deposit proof submitted by a relayer (spec §4.D, §6 `Deposit`).
pub struct DepositProof {
    pub transaction: Transaction,
    pub proof: PartialMerkleTree,
    pub header_height: u32,
}

/// A recognized payment to a tracked P2SS address, located within a deposit
/// transaction's outputs.
struct PeggedOutput {
    vout: u32,
    amount: u64,
    p2ss_address: String,
    dest: Dest,
}

/// Admits a `Deposit` transaction: verifies the Merkle proof against the SPV
/// header chain, recognizes a payment to a tracked P2SS address, parses the
/// sidechain recipient from the commitment output, and records the UTXO
/// (spec §4.D).
///
/// Returns the recipient and the minted amount on success; the caller is
/// responsible for invoking the external coin ledger's `mint` hook.
pub fn relay_deposit(
    store: &mut dyn Storage,
    config: &PegConfig,
    proof: DepositProof,
) -> ContractResult<(Dest, u64)> {
    let queue = HeaderQueue {};
    let header = queue
        .get_by_height(store, proof.header_height, None)?
        .ok_or(ContractError::UnknownHeight(proof.header_height))?;

    let txid = proof.transaction.txid();

    if PROCESSED_TXS.has(store, &txid.into_inner()) {
        return Err(ContractError::AlreadyProcessed);
    }

    let mut txids = vec![];
    let mut indexes = vec![];
    let merkle_root = proof
        .proof
        .extract_matches(&mut txids, &mut indexes)
        .map_err(|e| ContractError::BadProof(e.to_string()))?;

    if merkle_root != header.merkle_root() {
        return Err(ContractError::BadProof(
            "merkle root does not match block header".into(),
        ));
    }
    if txids.len() != 1 || txids[0] != txid {
        return Err(ContractError::BadProof(
            "proof does not resolve to exactly the submitted transaction".into(),
        ));
    }

    let pegged = find_pegged_output(store, &proof.transaction)?;

    PROCESSED_TXS.save(store, &txid.into_inner(), &cosmwasm_std::Empty {})?;

    let utxo = Utxo {
        txid: txid.into_inner(),
        vout: pegged.vout,
        amount: pegged.amount,
        p2ss_address: pegged.p2ss_address,
    };
    UTXOS.save(store, utxo.key(), &utxo)?;

    let mint_amount = pegged.amount.saturating_sub(config.deposit_fee);

    Ok((pegged.dest, mint_amount))
}

/// Scans every (currently tracked or historical) P2SS address for a matching
/// output, then parses the paired OP_RETURN commitment. Fails
/// `NotPeggedPayment` if no output pays a tracked address, `MissingCommitment`
/// if a match is found but the commitment output is absent or malformed.
fn find_pegged_output(store: &dyn Storage, tx: &Transaction) -> ContractResult<PeggedOutput> {
    let tracked_addresses = tracked_p2ss_addresses(store)?;

    for (vout, output) in tx.output.iter().enumerate() {
        let Some(address) = tracked_addresses
            .iter()
            .find(|(_, script)| script == &output.script_pubkey)
            .map(|(address, _)| address.clone())
        else {
            continue;
        };

        let commitment_output = tx
            .output
            .iter()
            .find(|o| o.script_pubkey.is_op_return())
            .ok_or(ContractError::MissingCommitment)?;
        let payload = parse_op_return(&commitment_output.script_pubkey)?;
        let dest = Dest::from_commitment_bytes(&payload)?;

        return Ok(PeggedOutput {
            vout: vout as u32,
            amount: output.value,
            p2ss_address: address,
            dest,
        });
    }

    Err(ContractError::NotPeggedPayment)
}

fn tracked_p2ss_addresses(store: &dyn Storage) -> ContractResult<Vec<(String, bitcoin::Script)>> {
    let mut out = vec![];

    if let Some(current) = CURRENT_ADDRESS.may_load(store)? {
        if let Some(sigset) = sigset_for_address(store, &current)? {
            out.push((current, sigset.output_script()?));
        }
    }

    for entry in SIGSET_HISTORY.range(store, None, None, cosmwasm_std::Order::Descending) {
        let (address, sigset) = entry?;
        if out.iter().any(|(a, _)| a == &address) {
            continue;
        }
        out.push((address, sigset.output_script()?));
    }

    Ok(out)
}

fn parse_op_return(script: &bitcoin::Script) -> ContractResult<Vec<u8>> {
    script
        .instructions()
        .nth(1)
        .and_then(|i| i.ok())
        .and_then(|instr| instr.push_bytes().map(|b| b.as_bytes().to_vec()))
        .ok_or(ContractError::MissingCommitment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_return_parsing_extracts_pushed_payload() {
        let payload = vec![5u8, b'a', b'l', b'i', b'c', b'e'];
        let script = bitcoin::blockdata::script::Builder::new()
            .push_opcode(bitcoin::blockdata::opcodes::all::OP_RETURN)
            .push_slice(&payload)
            .into_script();

        let parsed = parse_op_return(&script).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn op_return_parsing_rejects_non_return_script() {
        let script = bitcoin::Script::new();
        assert!(matches!(
            parse_op_return(&script),
            Err(ContractError::MissingCommitment)
        ));
    }
}
