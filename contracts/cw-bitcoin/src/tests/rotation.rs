use bitcoin::hashes::Hash;
use bitcoin::TxMerkleNode;

use crate::config::{Network, PegConfig};
use crate::msg::{ExecuteMsg, QueryMsg};
use crate::signatory::SignatorySet;

use super::helper;

/// Spec §8 E3: adding a validator and having it commit a key rotates the
/// current P2SS address, while the old address stays queryable for UTXOs
/// still in flight under it.
#[test]
fn e3_adding_validator_rotates_signatory_set_and_retains_history() {
    let config = PegConfig {
        network: Network::Regtest,
        ..PegConfig::default()
    };
    let header = helper::header_with_merkle_root(TxMerkleNode::all_zeros());

    let (mut deps, b, _sigset_b) = helper::setup_single_validator(config.clone(), 10, header);

    let address_1: Option<String> = helper::query(&deps, QueryMsg::CurrentP2ssAddress {});
    let address_1 = address_1.expect("rotation after the initial SetValidators call");

    let a = helper::keys(2);

    // Register A in the validator map without a committed key yet: rotation
    // should leave the address unchanged since A isn't present in the
    // resulting signatory set.
    helper::execute(
        &mut deps,
        ExecuteMsg::SetValidators {
            validators: vec![(b.consensus_key, 10), (a.consensus_key, 10)],
        },
    )
    .unwrap();

    let address_after_registration: Option<String> =
        helper::query(&deps, QueryMsg::CurrentP2ssAddress {});
    assert_eq!(address_after_registration.as_deref(), Some(address_1.as_str()));

    let idx_a = helper::rank_index(&[(&b, 10), (&a, 10)], &a);
    let (pubkey_bytes, signature) = helper::commit_key_signature(&a);
    helper::execute(
        &mut deps,
        ExecuteMsg::SignatoryKey {
            signatory_index: idx_a,
            signatory_key: pubkey_bytes.into(),
            signature: signature.into(),
        },
    )
    .unwrap();

    helper::execute(
        &mut deps,
        ExecuteMsg::SetValidators {
            validators: vec![(b.consensus_key, 10), (a.consensus_key, 10)],
        },
    )
    .unwrap();

    let address_2: Option<String> = helper::query(&deps, QueryMsg::CurrentP2ssAddress {});
    let address_2 = address_2.expect("rotation after A commits its key");
    assert_ne!(address_1, address_2);

    let history_1: Option<SignatorySet> = helper::query(
        &deps,
        QueryMsg::SignatorySet {
            address: address_1.clone(),
        },
    );
    assert!(history_1.is_some(), "A₁'s signatory set must remain queryable for inflight UTXOs");
    assert_eq!(history_1.unwrap().len(), 1);

    let history_2: Option<SignatorySet> = helper::query(
        &deps,
        QueryMsg::SignatorySet { address: address_2 },
    );
    assert_eq!(history_2.unwrap().len(), 2);
}
