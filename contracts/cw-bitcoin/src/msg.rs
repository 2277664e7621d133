use bitcoin::util::merkleblock::PartialMerkleTree;
use bitcoin::{BlockHeader, Script, Transaction};
use common_bitcoin::adapter::Adapter;
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::Binary;

use crate::config::PegConfig;
use crate::state::Utxo;
use crate::threshold_sig::Signature;

#[cw_serde]
pub struct InstantiateMsg {
    pub config: PegConfig,
    pub trusted_height: u32,
    pub trusted_header: Adapter<BlockHeader>,
    pub validators: Vec<(Binary32, u64)>,
}

/// A 32-byte ed25519 consensus key, carried as raw bytes at the message
/// boundary (spec §3 "Validator").
pub type Binary32 = [u8; 32];

#[cw_serde]
pub enum ExecuteMsg {
    /// Spec §6 `Headers { headers: [BtcHeader] }`.
    Headers {
        headers: Vec<(u32, Adapter<BlockHeader>)>,
    },
    /// Spec §6 `Deposit { transaction, proof }`.
    Deposit {
        transaction: Adapter<Transaction>,
        proof: Adapter<PartialMerkleTree>,
        header_height: u32,
    },
    /// Spec §6 `SignatoryKey { signatory_index, signatory_key, signature }`.
    SignatoryKey {
        signatory_index: u32,
        signatory_key: Binary,
        signature: Binary,
    },
    /// Spec §6 `Signature { signatory_index, signatures }`.
    Signature {
        signatory_index: u32,
        signatures: Vec<Signature>,
    },
    /// Spec §6 `Withdrawal { script, amount }`, submitted by the (external)
    /// coin ledger when pegged coins are burned.
    Withdrawal {
        script: Adapter<Script>,
        amount: u64,
    },
    /// Updates the validator map for the current block (spec §5: "the
    /// validator map [is threaded] as an explicit argument on every state
    /// transition"), then runs rotation (spec §4.G).
    SetValidators {
        validators: Vec<(Binary32, u64)>,
    },
    /// Builds a `SigningTx` from the queued pending outputs against the
    /// current UTXO set (spec §4.E).
    BuildDisbursal {},
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(Option<String>)]
    CurrentP2ssAddress {},
    #[returns(Option<crate::signatory::SignatorySet>)]
    SignatorySet { address: String },
    #[returns(u32)]
    ChainHeight {},
    #[returns(Vec<Utxo>)]
    Utxos {},
    #[returns(bool)]
    ProcessedTx { txid: Binary },
    #[returns(Option<crate::signing_tx::SigningTx>)]
    SigningTx {},
    #[returns(Option<Adapter<Transaction>>)]
    SignedTx {},
}

#[cw_serde]
pub struct MigrateMsg {}
