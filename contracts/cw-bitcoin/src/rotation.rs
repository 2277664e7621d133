use cosmwasm_std::{Env, Storage};

use crate::config::PegConfig;
use crate::error::ContractResult;
use crate::registry::{committed_key, rank_validators};
use crate::interface::Validator;
use crate::signatory::SignatorySet;
use crate::state::{CURRENT_ADDRESS, NEXT_SIGSET_INDEX, SIGSET_HISTORY};

/// Recomputes the signatory set from the current validator map and committed
/// keys, and publishes a new current P2SS address if it differs from the
/// previous one (spec §4.G).
///
/// The prior address stays indexed in `SIGSET_HISTORY` so UTXOs paid to it
/// remain spendable; rotation never migrates UTXOs between addresses.
pub fn maybe_rotate(store: &mut dyn Storage, env: &Env, config: &PegConfig) -> ContractResult<bool> {
    let validators: Vec<Validator> = rank_validators(store, config.max_signatories)?
        .into_iter()
        .map(|(pubkey, power)| Validator { pubkey, power })
        .collect();

    let index = NEXT_SIGSET_INDEX.may_load(store)?.unwrap_or(0);
    let sigset = SignatorySet::from_validators(
        &validators,
        |consensus_key| committed_key(store, consensus_key),
        env.block.time.seconds(),
        index,
        config.max_signatories,
        config.sigset_threshold,
    );

    if sigset.is_empty() {
        return Ok(false);
    }

    let network: bitcoin::Network = config.network.into();
    let address = sigset.address(network)?.to_string();

    let current = CURRENT_ADDRESS.may_load(store)?;
    if current.as_deref() == Some(address.as_str()) {
        return Ok(false);
    }

    SIGSET_HISTORY.save(store, address.clone(), &sigset)?;
    CURRENT_ADDRESS.save(store, &address)?;
    NEXT_SIGSET_INDEX.save(store, &(index + 1))?;

    Ok(true)
}

/// Looks up the signatory set that secures a given (current or historical)
/// P2SS address.
pub fn sigset_for_address(store: &dyn Storage, address: &str) -> ContractResult<Option<SignatorySet>> {
    Ok(SIGSET_HISTORY.may_load(store, address.to_string())?)
}
