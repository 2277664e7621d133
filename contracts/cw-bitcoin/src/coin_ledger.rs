use cosmwasm_std::{Addr, Response};

use crate::error::ContractResult;

/// The boundary to the sidechain's pegged-coin ledger (spec §1 "Explicitly
/// out of scope", §6 "Produced events"): a separate module, external to this
/// core, that holds pegged balances and emits withdrawal events.
///
/// The core never calls into the ledger directly — it is a different
/// contract reached over CosmWasm's message-passing, not a Rust trait object
/// invoked in-process. This trait documents the two hooks the core expects
/// of it and lets tests exercise the core without a real ledger deployed.
pub trait CoinLedger {
    /// Credits `amount` (already net of the deposit fee) to `recipient`,
    /// following a verified deposit (spec §4.D).
    fn mint(&mut self, recipient: &Addr, amount: u64) -> ContractResult<Response>;
}

/// A `CoinLedger` that records calls without touching any external state,
/// for exercising deposit handling in isolation.
#[derive(Default)]
pub struct NoopLedger {
    pub minted: Vec<(Addr, u64)>,
}

impl CoinLedger for NoopLedger {
    fn mint(&mut self, recipient: &Addr, amount: u64) -> ContractResult<Response> {
        self.minted.push((recipient.clone(), amount));
        Ok(Response::new()
            .add_attribute("action", "mint")
            .add_attribute("recipient", recipient)
            .add_attribute("amount", amount.to_string()))
    }
}
