use cosmwasm_schema::cw_serde;
use light_client_bitcoin::HeaderConfig;

use crate::constants::{MAX_SIGNATORIES, MIN_RELAY_FEE, SIGSET_THRESHOLD};

/// Network-wide tunables for the peg core, collected into a single stored
/// value rather than scattered constants (spec §6 "Constants", §9 "surface
/// fee parameters in a single named configuration struct").
#[cw_serde]
pub struct PegConfig {
    /// The target Bitcoin network (`bitcoin | testnet | regtest`).
    pub network: Network,
    /// Maximum number of signatories admitted into a signatory set.
    pub max_signatories: u64,
    /// `(numerator, denominator)` ratio applied to a signatory set's total
    /// voting power to compute its signing threshold.
    pub sigset_threshold: (u64, u64),
    /// Fixed fee floor for disbursals, in satoshis.
    pub min_relay_fee: u64,
    /// Amount deducted from a verified deposit before minting, in satoshis.
    pub deposit_fee: u64,
}

impl Default for PegConfig {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            max_signatories: MAX_SIGNATORIES,
            sigset_threshold: SIGSET_THRESHOLD,
            min_relay_fee: MIN_RELAY_FEE,
            deposit_fee: 0,
        }
    }
}

/// Mirrors `bitcoin::Network`, but kept as our own serializable/queryable
/// type so `PegConfig` doesn't depend on the `bitcoin` crate's own (de)serde
/// representation.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum Network {
    Bitcoin,
    Testnet,
    Regtest,
}

impl From<Network> for bitcoin::Network {
    fn from(n: Network) -> Self {
        match n {
            Network::Bitcoin => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Regtest => bitcoin::Network::Regtest,
        }
    }
}

/// Builds a starting `HeaderConfig` for a fresh deployment, seeded from an
/// explicit trusted header rather than a baked-in checkpoint file.
pub fn header_config(
    trusted_height: u32,
    trusted_header: bitcoin::BlockHeader,
    min_difficulty_blocks: bool,
) -> HeaderConfig {
    HeaderConfig::new(trusted_height, trusted_header, min_difficulty_blocks)
}
