use bitcoin::BlockHeader;
use common_bitcoin::adapter::Adapter;
use cosmwasm_schema::schemars::JsonSchema;
use cosmwasm_schema::serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_LENGTH, MAX_TARGET, MAX_TIME_INCREASE, RETARGET_INTERVAL, TARGET_SPACING, TARGET_TIMESPAN,
};
use crate::header::{WorkHeader, WrappedHeader};

/// Configuration parameters for the SPV header chain, seeded from a single
/// trusted header (spec §3: "an ordered sequence of Bitcoin block headers
/// starting from a trusted initial header").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "cosmwasm_schema::serde")]
#[schemars(crate = "cosmwasm_schema::schemars")]
pub struct HeaderConfig {
    /// The maximum number of headers that can be stored in the header queue
    /// before pruning.
    pub max_length: u64,
    /// The maximum amount of time (in seconds) that can pass between the
    /// timestamp of the last header in the queue and the timestamp of the
    /// next header to be added.
    pub max_time_increase: u32,
    /// The height of the trusted header.
    pub trusted_height: u32,
    /// The interval (in blocks) at which the difficulty target is adjusted.
    pub retarget_interval: u32,
    /// The target time interval (in seconds) between blocks.
    pub target_spacing: u32,
    /// The target amount of time (in seconds) a full retargeting period
    /// should span. Should equal `retarget_interval * target_spacing`.
    pub target_timespan: u32,
    /// The maximum target value (minimum difficulty).
    pub max_target: u32,
    /// Whether the header queue should retarget difficulty at all.
    pub retargeting: bool,
    /// Whether the header queue should drop to minimum difficulty after a gap
    /// in block production (testnet/regtest rule, spec §4.D / §9).
    pub min_difficulty_blocks: bool,
    /// The trusted header that seeds the queue.
    pub trusted_header: Adapter<BlockHeader>,
}

impl HeaderConfig {
    /// Builds a config from an explicit trusted checkpoint. Production
    /// deployments pin this to a recent mainnet header; tests and regtest
    /// pin it to the genesis block.
    pub fn new(height: u32, header: BlockHeader, min_difficulty_blocks: bool) -> Self {
        Self {
            max_length: MAX_LENGTH,
            max_time_increase: MAX_TIME_INCREASE,
            trusted_height: height,
            retarget_interval: RETARGET_INTERVAL,
            target_spacing: TARGET_SPACING,
            target_timespan: TARGET_TIMESPAN,
            max_target: MAX_TARGET,
            trusted_header: header.into(),
            retargeting: true,
            min_difficulty_blocks,
        }
    }

    pub fn work_header(&self) -> WorkHeader {
        let wrapped = WrappedHeader::new(self.trusted_header.clone(), self.trusted_height);
        let work = wrapped.work();
        WorkHeader::new(wrapped, work)
    }
}
