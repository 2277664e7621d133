use bitcoin::blockdata::opcodes::all::OP_RETURN;
use bitcoin::blockdata::script::Builder;
use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, BlockHeader, PackedLockTime, Script, Transaction, TxMerkleNode, TxOut};
use cosmwasm_std::testing::{mock_dependencies, mock_env, mock_info, MockApi, MockQuerier, MockStorage};
use cosmwasm_std::{Binary, OwnedDeps, Response};
use ed25519_dalek::Signer;

use crate::config::PegConfig;
use crate::constants::{MAX_SIGNATORIES, SIGSET_THRESHOLD};
use crate::contract;
use crate::error::ContractResult;
use crate::interface::{Dest, Validator};
use crate::msg::{ExecuteMsg, InstantiateMsg};
use crate::signatory::SignatorySet;
use crate::threshold_sig::Pubkey;

/// A validator's full keypair: the ed25519 consensus key the peg core
/// identifies it by, and the secp256k1 key it commits to sign with.
pub struct Keys {
    pub esk: ed25519_dalek::SigningKey,
    pub consensus_key: [u8; 32],
    pub sk: bitcoin::secp256k1::SecretKey,
    pub pubkey: Pubkey,
}

pub fn keys(seed: u8) -> Keys {
    let esk = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
    let consensus_key = esk.verifying_key().to_bytes();

    let secp = bitcoin::secp256k1::Secp256k1::new();
    let sk = bitcoin::secp256k1::SecretKey::from_slice(&[seed.wrapping_add(100).max(1); 32]).unwrap();
    let pubkey: Pubkey = bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &sk).into();

    Keys {
        esk,
        consensus_key,
        sk,
        pubkey,
    }
}

/// Signs the raw secp256k1 pubkey bytes with a validator's ed25519 consensus
/// key, the same authentication `commit_key` verifies (spec §4.C).
pub fn commit_key_signature(validator: &Keys) -> (Vec<u8>, Vec<u8>) {
    let pubkey_bytes = validator.pubkey.as_slice().to_vec();
    let signature = validator.esk.sign(&pubkey_bytes);
    (pubkey_bytes, signature.to_bytes().to_vec())
}

/// Reproduces the `(-voting_power, -consensus_key)` ranking `rank_validators`/
/// `sort_and_truncate` apply, so a test can learn a signatory's index without
/// hardcoding it (indices depend on derived key bytes it cannot predict by
/// hand).
pub fn rank_index(validators: &[(&Keys, u64)], target: &Keys) -> u32 {
    let mut ranked: Vec<([u8; 32], u64)> = validators
        .iter()
        .map(|(k, power)| (k.consensus_key, *power))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    ranked
        .iter()
        .position(|(ck, _)| ck == &target.consensus_key)
        .expect("target validator not present in the ranked set") as u32
}

/// Predicts the signatory set a given set of committed validators will
/// freeze to, independent of any contract state — `create_time` doesn't
/// affect the derived script or address, only signatory composition does, so
/// this can be computed before `instantiate` is ever called (spec §4.A).
pub fn predict_sigset(entries: &[(Validator, Pubkey)], index: u32) -> SignatorySet {
    SignatorySet::from_validators(
        entries.iter().map(|(v, _)| v),
        |consensus_key| {
            entries
                .iter()
                .find(|(v, _)| &v.pubkey == consensus_key)
                .map(|(_, pk)| pk.clone())
        },
        0,
        index,
        MAX_SIGNATORIES,
        SIGSET_THRESHOLD,
    )
}

/// A `BlockHeader` carrying the given merkle root, with every other field
/// left at an arbitrary placeholder value. `HeaderQueue::configure` performs
/// no proof-of-work validation on a trusted/seed header, so this is
/// sufficient to deterministically drive deposit verification without
/// mining.
pub fn header_with_merkle_root(merkle_root: TxMerkleNode) -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_blockhash: BlockHash::all_zeros(),
        merkle_root,
        time: 0,
        bits: 0x207fffff,
        nonce: 0,
    }
}

/// Builds a deposit transaction paying `amount` to `pay_to`, with the
/// recipient commitment carried in a trailing OP_RETURN output (spec §4.D.6).
pub fn deposit_tx(pay_to: &Script, amount: u64, dest: &Dest) -> Transaction {
    let commitment = dest.commitment_bytes().unwrap();
    let op_return = Builder::new()
        .push_opcode(OP_RETURN)
        .push_slice(&commitment)
        .into_script();

    Transaction {
        version: 1,
        lock_time: PackedLockTime(0),
        input: vec![],
        output: vec![
            TxOut {
                value: amount,
                script_pubkey: pay_to.clone(),
            },
            TxOut {
                value: 0,
                script_pubkey: op_return,
            },
        ],
    }
}

pub type TestDeps = OwnedDeps<MockStorage, MockApi, MockQuerier>;

/// Instantiates the contract with a single validator and walks it through key
/// commitment and rotation, landing on a deterministic current address. Used
/// as the common starting point for the deposit and disbursal scenario tests.
pub fn setup_single_validator(
    config: PegConfig,
    power: u64,
    deposit_header: BlockHeader,
) -> (TestDeps, Keys, SignatorySet) {
    let validator = keys(1);
    let sigset = predict_sigset(
        &[(
            Validator {
                pubkey: validator.consensus_key,
                power,
            },
            validator.pubkey.clone(),
        )],
        0,
    );

    let mut deps = mock_dependencies();
    contract::instantiate(
        deps.as_mut(),
        mock_env(),
        mock_info("relayer", &[]),
        InstantiateMsg {
            config,
            trusted_height: 0,
            trusted_header: deposit_header.into(),
            validators: vec![(validator.consensus_key, power)],
        },
    )
    .unwrap();

    let (pubkey_bytes, signature) = commit_key_signature(&validator);
    execute(
        &mut deps,
        ExecuteMsg::SignatoryKey {
            signatory_index: 0,
            signatory_key: Binary::from(pubkey_bytes),
            signature: Binary::from(signature),
        },
    )
    .unwrap();

    execute(
        &mut deps,
        ExecuteMsg::SetValidators {
            validators: vec![(validator.consensus_key, power)],
        },
    )
    .unwrap();

    (deps, validator, sigset)
}

pub fn execute(deps: &mut TestDeps, msg: ExecuteMsg) -> ContractResult<Response> {
    contract::execute(deps.as_mut(), mock_env(), mock_info("relayer", &[]), msg)
}

pub fn query<T: cosmwasm_schema::serde::de::DeserializeOwned>(
    deps: &TestDeps,
    msg: crate::msg::QueryMsg,
) -> T {
    let bin = contract::query(deps.as_ref(), mock_env(), msg).unwrap();
    cosmwasm_std::from_json(&bin).unwrap()
}
