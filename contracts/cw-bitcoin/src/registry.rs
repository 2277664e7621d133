use cosmwasm_std::{Api, Storage};

use crate::constants::{SIGNATORY_KEY_LENGTH, SIGNATURE_LENGTH};
use crate::error::{ContractError, ContractResult};
use crate::state::{SIGNING_TX, SIG_KEYS, VALIDATORS};
use crate::threshold_sig::Pubkey;

/// Ranks the full validator map the same way the signatory-set selector does
/// (spec §4.A), so a `signatory_index` submitted against the key registry
/// means the same thing as one submitted against a frozen `SignatorySet`.
pub fn rank_validators(
    store: &dyn Storage,
    max_signatories: u64,
) -> ContractResult<Vec<([u8; 32], u64)>> {
    let mut validators: Vec<([u8; 32], u64)> = VALIDATORS
        .range(store, None, None, cosmwasm_std::Order::Ascending)
        .map(|item| {
            let (key, power) = item?;
            let mut consensus_key = [0u8; 32];
            consensus_key.copy_from_slice(&key);
            Ok((consensus_key, power))
        })
        .collect::<ContractResult<_>>()?;

    validators.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
    validators.truncate(max_signatories as usize);

    Ok(validators)
}

/// Admits a `SignatoryKey` transaction (spec §4.C): a validator commits a
/// secp256k1 public key, authenticated by an ed25519 signature under its
/// consensus key.
pub fn commit_key(
    store: &mut dyn Storage,
    api: &dyn Api,
    signatory_index: u32,
    signatory_key: &[u8],
    signature: &[u8],
    max_signatories: u64,
) -> ContractResult<()> {
    if signatory_key.len() != SIGNATORY_KEY_LENGTH {
        return Err(ContractError::BadFormat(format!(
            "expected a {}-byte signatory key, got {}",
            SIGNATORY_KEY_LENGTH,
            signatory_key.len()
        )));
    }
    if signature.len() != SIGNATURE_LENGTH {
        return Err(ContractError::BadFormat(format!(
            "expected a {}-byte ed25519 signature, got {}",
            SIGNATURE_LENGTH,
            signature.len()
        )));
    }

    let validators = rank_validators(store, max_signatories)?;
    let (consensus_key, _power) = validators
        .get(signatory_index as usize)
        .ok_or(ContractError::BadIndex(signatory_index))?;

    let pubkey = Pubkey::try_from_slice(signatory_key)?;

    let verified = api
        .ed25519_verify(signatory_key, signature, consensus_key)
        .map_err(|_| ContractError::BadSignature)?;
    if !verified {
        return Err(ContractError::BadSignature);
    }

    if SIGNING_TX.may_load(store)?.is_some() && SIG_KEYS.has(store, consensus_key) {
        return Err(ContractError::BadFormat(
            "signatory key cannot be re-committed while a disbursal is in flight".into(),
        ));
    }

    SIG_KEYS.save(store, consensus_key, &pubkey)?;

    Ok(())
}

/// Looks up a validator's committed secp256k1 key, used by the selector
/// (§4.A) when freezing a new signatory set.
pub fn committed_key(store: &dyn Storage, consensus_key: &[u8; 32]) -> Option<Pubkey> {
    SIG_KEYS.load(store, consensus_key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::testing::mock_dependencies;

    #[test]
    fn rejects_out_of_range_index() {
        let mut deps = mock_dependencies();
        VALIDATORS
            .save(deps.as_mut().storage, &[1u8; 32], &10)
            .unwrap();

        let result = commit_key(
            deps.as_mut().storage,
            &deps.api,
            5,
            &[2u8; SIGNATORY_KEY_LENGTH],
            &[3u8; SIGNATURE_LENGTH],
            crate::constants::MAX_SIGNATORIES,
        );
        assert!(matches!(result, Err(ContractError::BadIndex(5))));
    }

    #[test]
    fn rejects_malformed_key_length() {
        let mut deps = mock_dependencies();
        VALIDATORS
            .save(deps.as_mut().storage, &[1u8; 32], &10)
            .unwrap();

        let result = commit_key(
            deps.as_mut().storage,
            &deps.api,
            0,
            &[2u8; 10],
            &[3u8; SIGNATURE_LENGTH],
            crate::constants::MAX_SIGNATORIES,
        );
        assert!(matches!(result, Err(ContractError::BadFormat(_))));
    }
}
