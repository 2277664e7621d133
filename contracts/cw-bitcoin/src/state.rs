use common_bitcoin::adapter::Adapter;
use common_bitcoin::deque::DequeExtension;
use cosmwasm_std::Empty;
use cw_storage_plus::{Item, Map};

use crate::config::PegConfig;
use crate::signatory::SignatorySet;
use crate::signing_tx::SigningTx;
use crate::threshold_sig::Pubkey;

pub use light_client_bitcoin::{CURRENT_WORK, HEADERS, HEADER_CONFIG};

pub const PEG_CONFIG: Item<PegConfig> = Item::new("peg_config");

/// The full validator map as of the last block processed, keyed by ed25519
/// consensus key (spec §3 "Validator").
pub const VALIDATORS: Map<&[u8], u64> = Map::new("validators");

/// Committed secp256k1 keys, keyed by the owning validator's consensus key
/// (spec §4.C).
pub const SIG_KEYS: Map<&[u8], Pubkey> = Map::new("sig_keys");

/// The bech32 P2WSH address of the current signatory set.
pub const CURRENT_ADDRESS: Item<String> = Item::new("current_address");

/// Every signatory set ever frozen, keyed by its derived P2WSH address, so
/// deposits and withdrawals against old (inflight) addresses remain valid
/// after rotation (spec §3 "P2SS address", §4.G).
pub const SIGSET_HISTORY: Map<String, SignatorySet> = Map::new("sigset_history");

/// Monotonic counter assigned to each newly frozen signatory set.
pub const NEXT_SIGSET_INDEX: Item<u32> = Item::new("next_sigset_index");

/// UTXOs currently held by some signatory set's P2SS address, keyed by
/// `(txid hex, vout)`.
pub const UTXOS: Map<(String, u64), Utxo> = Map::new("utxos");

/// Txids already accepted as deposits, guaranteeing at-most-once minting
/// (spec §3 "Processed-tx set").
pub const PROCESSED_TXS: Map<&[u8], Empty> = Map::new("processed_txs");

/// The disbursal transaction currently collecting signatures, if any.
pub const SIGNING_TX: Item<SigningTx> = Item::new("signing_tx");

/// The most recently finalized, fully-signed disbursal transaction.
pub const SIGNED_TX: Item<Adapter<bitcoin::Transaction>> = Item::new("signed_tx");

/// Withdrawal outputs queued by the external coin ledger, waiting to be
/// picked up by the next disbursal build (spec §4.E, §6 `Withdrawal`).
pub const PENDING_OUTPUTS: DequeExtension<PendingOutput> = DequeExtension::new("pending_outputs");

/// A UTXO created by a verified deposit (spec §3 "UTXO").
#[derive(Clone, Debug, PartialEq, cosmwasm_schema::serde::Serialize, cosmwasm_schema::serde::Deserialize, cosmwasm_schema::schemars::JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct Utxo {
    pub txid: [u8; 32],
    pub vout: u32,
    pub amount: u64,
    /// The derived P2WSH address this UTXO pays, identifying which
    /// signatory set it is spendable under.
    pub p2ss_address: String,
}

impl Utxo {
    pub fn key(&self) -> (String, u64) {
        use bitcoin::hashes::hex::ToHex;
        (self.txid[..].to_hex(), self.vout as u64)
    }
}

/// A withdrawal output awaiting inclusion in the next `SigningTx` (spec §6
/// `Withdrawal`).
#[derive(Clone, Debug, PartialEq, cosmwasm_schema::serde::Serialize, cosmwasm_schema::serde::Deserialize, cosmwasm_schema::schemars::JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct PendingOutput {
    pub script: Adapter<bitcoin::Script>,
    pub amount: u64,
}
