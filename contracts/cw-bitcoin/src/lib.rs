pub mod coin_ledger;
pub mod config;
mod constants;
pub mod contract;
mod deposit;
mod error;
mod header;
mod interface;
mod msg;
mod registry;
mod rotation;
mod signatory;
mod signing_tx;
mod state;
#[cfg(test)]
mod tests;
mod threshold_sig;

pub use error::{ContractError, ContractResult};
pub use msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
