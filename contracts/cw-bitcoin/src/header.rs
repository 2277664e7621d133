use cosmwasm_std::Storage;
use light_client_bitcoin::{HeaderList, HeaderQueue, WrappedHeader};

use crate::error::ContractResult;

/// Admits a batch of relayed Bitcoin block headers into the SPV chain (spec
/// §4 "Header Queue" via the `Headers` transaction, spec §6).
///
/// Each header is paired with the height it claims; the queue itself
/// validates proof-of-work, difficulty retargeting and reorg depth before
/// extending or replacing its tip.
pub fn relay_headers(
    store: &mut dyn Storage,
    headers: Vec<(u32, bitcoin::BlockHeader)>,
) -> ContractResult<()> {
    let mut queue = HeaderQueue {};
    let wrapped: HeaderList = headers
        .into_iter()
        .map(|(height, header)| WrappedHeader::from_header(&header, height))
        .collect::<Vec<_>>()
        .into();

    queue.add(store, wrapped)
}

pub fn current_height(store: &dyn Storage) -> ContractResult<u32> {
    HeaderQueue {}.height(store)
}

pub fn current_hash(store: &dyn Storage) -> ContractResult<bitcoin::BlockHash> {
    HeaderQueue {}.hash(store)
}
