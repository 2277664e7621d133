use std::collections::HashMap;

use bitcoin::blockdata::block::BlockHeader;
use bitcoin::util::uint::Uint256;
use bitcoin::BlockHash;
use common_bitcoin::adapter::Adapter;
use common_bitcoin::deque::DequeExtension;
use common_bitcoin::error::{ContractError, ContractResult};
use cosmwasm_std::Storage;
use cw_storage_plus::Item;

use crate::constants::MAX_HEADERS_RELAY_ONE_TIME;
use crate::header::{WorkHeader, WrappedHeader};
use crate::interface::HeaderConfig;

/// Storage-backed queue of `WorkHeader`s. Kept as a `DequeExtension` rather
/// than a plain `Vec` so a long-lived header chain never has to be loaded
/// into memory all at once.
pub const HEADERS: DequeExtension<WorkHeader> = DequeExtension::new("light_client_headers");
pub const CURRENT_WORK: Item<Adapter<Uint256>> = Item::new("light_client_current_work");
pub const HEADER_CONFIG: Item<HeaderConfig> = Item::new("light_client_header_config");

/// The height of the last header in the header queue, or 0 if the queue has
/// not yet been configured.
pub fn header_height(store: &dyn Storage) -> ContractResult<u32> {
    match HEADERS.back(store)? {
        Some(inner) => Ok(inner.height()),
        None => Ok(0),
    }
}

/// A list of headers relayed together in a single `RelayHeaders` transaction.
#[derive(Debug, Clone)]
pub struct HeaderList(Vec<WrappedHeader>);

impl From<Vec<WrappedHeader>> for HeaderList {
    fn from(headers: Vec<WrappedHeader>) -> Self {
        HeaderList(headers)
    }
}

impl From<HeaderList> for Vec<WrappedHeader> {
    fn from(headers: HeaderList) -> Self {
        headers.0
    }
}

impl FromIterator<WrappedHeader> for HeaderList {
    fn from_iter<T: IntoIterator<Item = WrappedHeader>>(iter: T) -> Self {
        HeaderList(iter.into_iter().collect())
    }
}

/// A queue of Bitcoin block headers, along with the total estimated amount of
/// work (measured in hashes) done in the headers included in the queue.
///
/// The header queue is used to validate headers as they are received from the
/// Bitcoin network, ensuring each header is associated with a valid
/// proof-of-work and that the chain of headers is valid.
///
/// The queue is able to reorg if a new chain of headers is received that
/// contains more work than the current chain, however it can not process
/// reorgs that are deeper than the length of the queue (the length will be at
/// the configured pruning level based on the `max_length` config parameter).
///
/// `HeaderQueue` itself is stateless; all persistent data lives behind the
/// `HEADERS` / `CURRENT_WORK` / `HEADER_CONFIG` storage keys so that it can be
/// embedded in a contract without owning its own copy of the chain.
#[derive(Default)]
pub struct HeaderQueue {}

impl HeaderQueue {
    pub fn config(&self, store: &dyn Storage) -> ContractResult<HeaderConfig> {
        Ok(HEADER_CONFIG.load(store)?)
    }

    pub fn current_work(&self, store: &dyn Storage) -> ContractResult<Adapter<Uint256>> {
        Ok(CURRENT_WORK.load(store)?)
    }

    /// Verify and add a list of headers to the header queue.
    ///
    /// The headers must be consecutive and must bring the chain to a final
    /// state that has more work than the current chain.
    ///
    /// If the headers start from a height lower than the current height, the
    /// header queue will be reorged to the new chain as long as the new
    /// chain carries more total work. A reorg deeper than the queue's
    /// retained length (bounded by `max_length`) cannot be processed.
    pub fn add(&mut self, store: &mut dyn Storage, headers: HeaderList) -> ContractResult<()> {
        let headers: Vec<_> = headers.into();

        if headers.len() as u64 > MAX_HEADERS_RELAY_ONE_TIME {
            return Err(ContractError::Header(
                "exceeded maximum amount of relayed headers".to_string(),
            ));
        }

        self.add_into_iter(store, headers)
    }

    /// Verify and add an iterator of headers to the header queue. See `add`.
    pub fn add_into_iter<T>(&mut self, store: &mut dyn Storage, headers: T) -> ContractResult<()>
    where
        T: IntoIterator<Item = WrappedHeader>,
    {
        let headers: Vec<WrappedHeader> = headers.into_iter().collect();
        let current_height = self.height(store)?;
        let config = self.config(store)?;

        let first = headers
            .first()
            .ok_or_else(|| ContractError::Header("passed header list empty".into()))?;

        let mut removed_work = Uint256::default();
        if first.height() <= current_height {
            let first_replaced = self
                .get_by_height(store, first.height(), None)?
                .ok_or_else(|| ContractError::Header("header not found".into()))?;

            if first_replaced.block_hash() == first.block_hash() {
                return Err(ContractError::Header("provided redundant header".into()));
            }

            removed_work = self.pop_back_to(store, first.height())?;
        }

        let added_work = self.verify_and_add_headers(store, &headers)?;
        if added_work <= removed_work {
            return Err(ContractError::Header(
                "new best chain must include more work than old best chain".into(),
            ));
        }

        let mut queue_len = self.len(store)?;
        let mut current_work = *self.current_work(store)?;
        while queue_len > config.max_length {
            let header = match HEADERS.pop_front(store)? {
                Some(inner) => inner,
                None => break,
            };
            queue_len -= 1;
            current_work = current_work - header.work();
        }
        CURRENT_WORK.save(store, &Adapter::new(current_work))?;

        Ok(())
    }

    /// Verify and add a list of headers to the header queue, returning the
    /// amount of additional estimated work added to the header queue.
    fn verify_and_add_headers(
        &mut self,
        store: &mut dyn Storage,
        headers: &[WrappedHeader],
    ) -> ContractResult<Uint256> {
        let first_height = headers
            .first()
            .ok_or_else(|| ContractError::Header("passed header list is empty".into()))?
            .height();

        if first_height == 0 {
            return Err(ContractError::Header(
                "headers must start after height 0".into(),
            ));
        }

        let prev_header = [self
            .get_by_height(store, first_height - 1, None)?
            .ok_or_else(|| ContractError::Header("headers not connected to chain".into()))?
            .header];

        let headers = prev_header.iter().chain(headers.iter()).zip(headers.iter());

        let mut work = Uint256::default();
        let mut cache_bits: HashMap<u32, u32> = HashMap::new();

        for (prev_header, header) in headers {
            if header.height() != prev_header.height() + 1 {
                return Err(ContractError::Header(
                    "non-consecutive headers passed".into(),
                ));
            }

            if header.prev_blockhash() != prev_header.block_hash() {
                return Err(ContractError::Header(
                    "passed header references incorrect previous block hash".into(),
                ));
            }

            if HEADERS.len(store)? >= 11 {
                self.validate_time(store, header)?;
            }

            let initial_height = self.get_initial_height(store)?;
            let target =
                self.get_next_target(store, header, prev_header, initial_height, &mut cache_bits)?;
            header.validate_pow(&target)?;

            let header_work = header.work();
            work = work + header_work;

            let chain_work = *self.current_work(store)? + header_work;
            let work_header = WorkHeader::new(header.clone(), chain_work);
            HEADERS.push_back(store, &work_header)?;
            CURRENT_WORK.save(store, &Adapter::new(chain_work))?;
        }

        Ok(work)
    }

    /// Calculate the expected next target based on the passed header and the
    /// previous header.
    fn get_next_target(
        &self,
        store: &dyn Storage,
        header: &WrappedHeader,
        previous_header: &WrappedHeader,
        initial_height: u32,
        cache_bits: &mut HashMap<u32, u32>,
    ) -> ContractResult<Uint256> {
        let config = self.config(store)?;

        if header.height() % config.retarget_interval == 0 {
            let first_reorg_height = header.height() - config.retarget_interval;
            return self.calculate_next_target(store, previous_header, first_reorg_height);
        }

        if !config.min_difficulty_blocks {
            return Ok(previous_header.target());
        }

        if header.time() > previous_header.time() + config.target_spacing * 2 {
            return Ok(WrappedHeader::u256_from_compact(config.max_target));
        }

        let mut current_header_height = previous_header.height();
        let mut current_bits = previous_header.bits();

        while current_header_height > 0
            && current_header_height % config.retarget_interval != 0
            && current_bits == config.max_target
        {
            current_header_height -= 1;

            current_bits = match cache_bits.get(&current_header_height) {
                Some(bits) => *bits,
                None => {
                    let bits = HEADERS
                        .get(store, current_header_height - initial_height)?
                        .ok_or_else(|| ContractError::Header("no previous header exists".into()))?
                        .header
                        .bits();
                    cache_bits.insert(current_header_height, bits);
                    bits
                }
            };
        }

        Ok(WrappedHeader::u256_from_compact(current_bits))
    }

    /// Calculate the expected next target based on the passed header and the
    /// height of the previous retargeting header.
    fn calculate_next_target(
        &self,
        store: &dyn Storage,
        header: &WrappedHeader,
        first_reorg_height: u32,
    ) -> ContractResult<Uint256> {
        let config = self.config(store)?;

        if !config.retargeting {
            return Ok(WrappedHeader::u256_from_compact(header.bits()));
        }

        if header.height() < config.retarget_interval {
            return Err(ContractError::Header(
                "trusted header must have a height that is a multiple of the retarget interval"
                    .into(),
            ));
        }

        let prev_retarget = match self.get_by_height(store, first_reorg_height, None)? {
            Some(inner) => inner.time(),
            None => {
                return Err(ContractError::Header(
                    "no previous retargeting header exists".into(),
                ))
            }
        };

        let timespan = (header.time() - prev_retarget)
            .clamp(config.target_timespan / 4, config.target_timespan * 4);

        let target_timespan = WrappedHeader::u32_to_u256(config.target_timespan);
        let timespan = WrappedHeader::u32_to_u256(timespan);

        let target = header.target() * timespan / target_timespan;
        let target_u32 = BlockHeader::compact_target_from_u256(&target);
        let target = WrappedHeader::u256_from_compact(target_u32);

        Ok(target.min(WrappedHeader::u256_from_compact(config.max_target)))
    }

    /// Remove headers from the header queue until the height of the last
    /// header in the queue is equal to the passed height.
    fn pop_back_to(&mut self, store: &mut dyn Storage, height: u32) -> ContractResult<Uint256> {
        let mut work = Uint256::default();

        while self.height(store)? >= height {
            let header = HEADERS
                .pop_back(store)?
                .ok_or_else(|| ContractError::Header("removed all headers".into()))?;

            work = work + header.work();
        }

        Ok(work)
    }

    /// Validate the timestamp of the passed header against the median of the
    /// last 11 headers in the queue.
    fn validate_time(
        &self,
        store: &dyn Storage,
        current_header: &WrappedHeader,
    ) -> ContractResult<()> {
        let mut prev_stamps: Vec<u32> = Vec::with_capacity(11);
        let initial_height = self.get_initial_height(store)?;
        let height = self.height(store)?;

        for prev_height in height - 10..=height {
            let stamp = self
                .get_by_height(store, prev_height, Some(initial_height))?
                .ok_or_else(|| ContractError::Header("deque does not contain any elements".into()))?
                .time();
            prev_stamps.push(stamp);
        }

        prev_stamps.sort_unstable();

        let median_stamp = prev_stamps
            .get(5)
            .ok_or_else(|| ContractError::Header("median timestamp does not exist".into()))?;

        if current_header.time() <= *median_stamp {
            return Err(ContractError::Header(
                "header contains an invalid timestamp".into(),
            ));
        }

        Ok(())
    }

    /// The height of the last header in the header queue.
    pub fn height(&self, store: &dyn Storage) -> ContractResult<u32> {
        header_height(store)
    }

    /// The hash of the last header in the header queue.
    pub fn hash(&self, store: &dyn Storage) -> ContractResult<BlockHash> {
        match HEADERS.back(store)? {
            Some(inner) => Ok(inner.block_hash()),
            None => Err(ContractError::Header("header queue is empty".into())),
        }
    }

    /// The number of headers in the header queue.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self, store: &dyn Storage) -> ContractResult<u64> {
        Ok(HEADERS.len(store).unwrap_or(0) as u64)
    }

    /// Whether or not the header queue is empty. Always `false` once
    /// `configure` has run, since it seeds the queue with the trusted header.
    pub fn is_empty(&self, store: &dyn Storage) -> ContractResult<bool> {
        Ok(self.len(store)? == 0)
    }

    pub fn get_initial_height(&self, store: &dyn Storage) -> ContractResult<u32> {
        match HEADERS.front(store)? {
            Some(inner) => Ok(inner.height()),
            None => Err(ContractError::Header(
                "queue does not contain any headers".into(),
            )),
        }
    }

    /// Get a header from the header queue by its height. Returns `None` if
    /// the queue does not contain a header at that height; errors if the
    /// height is below the queue's initial (pruned) height.
    pub fn get_by_height(
        &self,
        store: &dyn Storage,
        height: u32,
        initial_height: Option<u32>,
    ) -> ContractResult<Option<WorkHeader>> {
        let initial_height = match initial_height {
            Some(val) => val,
            None => self.get_initial_height(store)?,
        };

        if height < initial_height {
            return Err(ContractError::Header(
                "referenced header has been pruned from the header queue".into(),
            ));
        }

        Ok(HEADERS.get(store, height - initial_height)?)
    }

    /// The height of the configured trusted header.
    pub fn trusted_height(&self, store: &dyn Storage) -> ContractResult<u32> {
        Ok(self.config(store)?.trusted_height)
    }

    /// Clears the header queue and configures it with the passed config,
    /// seeding the queue with the trusted header.
    pub fn configure(&mut self, store: &mut dyn Storage, config: HeaderConfig) -> ContractResult<()> {
        HEADERS.clear(store)?;
        let work_header = config.work_header();
        CURRENT_WORK.save(store, &work_header.chain_work)?;
        HEADERS.push_front(store, &work_header)?;
        HEADER_CONFIG.save(store, &config)?;
        Ok(())
    }

    /// The network the header queue is configured for.
    pub fn network(&self) -> bitcoin::Network {
        bitcoin::Network::Bitcoin
    }
}
