#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;

use cosmwasm_std::{to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Response, StdResult};
use cw2::set_contract_version;
use light_client_bitcoin::HeaderQueue;

use crate::deposit::{self, DepositProof};
use crate::error::{ContractError, ContractResult};
use crate::header;
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::registry;
use crate::rotation;
use crate::signing_tx::{self, Input};
use crate::state::{
    PendingOutput, CURRENT_ADDRESS, NEXT_SIGSET_INDEX, PEG_CONFIG, PENDING_OUTPUTS, SIGNED_TX,
    SIGNING_TX, UTXOS, VALIDATORS,
};

const CONTRACT_NAME: &str = "crates.io:cw-bitcoin";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    PEG_CONFIG.save(deps.storage, &msg.config)?;
    NEXT_SIGSET_INDEX.save(deps.storage, &0)?;

    let header_config = crate::config::header_config(
        msg.trusted_height,
        msg.trusted_header.into_inner(),
        false,
    );
    let mut queue = HeaderQueue {};
    queue.configure(deps.storage, header_config)?;

    for (pubkey, power) in msg.validators {
        VALIDATORS.save(deps.storage, &pubkey[..], &power)?;
    }

    Ok(Response::new().add_attribute("action", "instantiate"))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    _info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::Headers { headers } => {
            let headers = headers
                .into_iter()
                .map(|(height, header)| (height, header.into_inner()))
                .collect();
            header::relay_headers(deps.storage, headers)?;
            Ok(Response::new().add_attribute("action", "relay_headers"))
        }

        ExecuteMsg::Deposit {
            transaction,
            proof,
            header_height,
        } => {
            let config = PEG_CONFIG.load(deps.storage)?;
            let (dest, amount) = deposit::relay_deposit(
                deps.storage,
                &config,
                DepositProof {
                    transaction: transaction.into_inner(),
                    proof: proof.into_inner(),
                    header_height,
                },
            )?;

            Ok(Response::new()
                .add_attribute("action", "relay_deposit")
                .add_attribute("recipient", dest.0.as_str())
                .add_attribute("amount", amount.to_string()))
        }

        ExecuteMsg::SignatoryKey {
            signatory_index,
            signatory_key,
            signature,
        } => {
            let config = PEG_CONFIG.load(deps.storage)?;
            registry::commit_key(
                deps.storage,
                deps.api,
                signatory_index,
                &signatory_key,
                &signature,
                config.max_signatories,
            )?;
            Ok(Response::new()
                .add_attribute("action", "signatory_key")
                .add_attribute("signatory_index", signatory_index.to_string()))
        }

        ExecuteMsg::Signature {
            signatory_index,
            signatures,
        } => {
            let mut signing_tx = SIGNING_TX
                .may_load(deps.storage)?
                .ok_or(ContractError::App("no disbursal is awaiting signatures".into()))?;

            signing_tx.sign(deps.api, signatory_index, &signatures)?;

            if signing_tx.signed() {
                let bitcoin_tx = signing_tx.to_bitcoin_tx()?;
                SIGNED_TX.save(deps.storage, &bitcoin_tx.into())?;
                SIGNING_TX.remove(deps.storage);
            } else {
                SIGNING_TX.save(deps.storage, &signing_tx)?;
            }

            Ok(Response::new()
                .add_attribute("action", "signature")
                .add_attribute("signatory_index", signatory_index.to_string())
                .add_attribute("finalized", signing_tx.signed().to_string()))
        }

        ExecuteMsg::Withdrawal { script, amount } => {
            PENDING_OUTPUTS.push_back(
                deps.storage,
                &PendingOutput {
                    script,
                    amount,
                },
            )?;
            Ok(Response::new().add_attribute("action", "withdrawal"))
        }

        ExecuteMsg::SetValidators { validators } => {
            for entry in VALIDATORS
                .keys(deps.storage, None, None, cosmwasm_std::Order::Ascending)
                .collect::<StdResult<Vec<_>>>()?
            {
                VALIDATORS.remove(deps.storage, &entry);
            }
            for (pubkey, power) in &validators {
                VALIDATORS.save(deps.storage, &pubkey[..], power)?;
            }

            let config = PEG_CONFIG.load(deps.storage)?;
            let rotated = rotation::maybe_rotate(deps.storage, &env, &config)?;

            Ok(Response::new()
                .add_attribute("action", "set_validators")
                .add_attribute("rotated", rotated.to_string()))
        }

        ExecuteMsg::BuildDisbursal {} => build_disbursal(deps, env),
    }
}

fn build_disbursal(deps: DepsMut, _env: Env) -> ContractResult<Response> {
    let config = PEG_CONFIG.load(deps.storage)?;

    let current_address = CURRENT_ADDRESS
        .may_load(deps.storage)?
        .ok_or(ContractError::EmptySignatorySet)?;
    let sigset = rotation::sigset_for_address(deps.storage, &current_address)?
        .ok_or(ContractError::EmptySignatorySet)?;

    let utxos: Vec<_> = UTXOS
        .range(deps.storage, None, None, cosmwasm_std::Order::Ascending)
        .filter(|item| {
            item.as_ref()
                .map(|(_, utxo)| utxo.p2ss_address == current_address)
                .unwrap_or(false)
        })
        .collect::<StdResult<Vec<_>>>()?;

    let mut inputs = vec![];
    for (key, utxo) in &utxos {
        let txid = bitcoin::Txid::from_slice(&utxo.txid)?;
        let prevout = bitcoin::OutPoint::new(txid, utxo.vout);
        inputs.push(Input::new(prevout, &sigset, utxo.amount)?);
        UTXOS.remove(deps.storage, key.clone());
    }

    let mut user_outputs = vec![];
    while let Some(output) = PENDING_OUTPUTS.pop_front(deps.storage)? {
        user_outputs.push((output.script.into_inner(), output.amount));
    }

    let mut signing_tx =
        signing_tx::build_disbursal(inputs, user_outputs, &sigset, config.min_relay_fee)?;
    signing_tx.populate_sighashes()?;
    SIGNING_TX.save(deps.storage, &signing_tx)?;

    Ok(Response::new()
        .add_attribute("action", "build_disbursal")
        .add_attribute("n_inputs", signing_tx.input.len().to_string())
        .add_attribute("n_outputs", signing_tx.output.len().to_string()))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::CurrentP2ssAddress {} => {
            to_json_binary(&CURRENT_ADDRESS.may_load(deps.storage)?)
        }
        QueryMsg::SignatorySet { address } => {
            to_json_binary(&rotation::sigset_for_address(deps.storage, &address)?)
        }
        QueryMsg::ChainHeight {} => to_json_binary(&header::current_height(deps.storage)?),
        QueryMsg::Utxos {} => {
            let utxos: Vec<_> = UTXOS
                .range(deps.storage, None, None, cosmwasm_std::Order::Ascending)
                .map(|item| item.map(|(_, utxo)| utxo))
                .collect::<StdResult<_>>()?;
            to_json_binary(&utxos)
        }
        QueryMsg::ProcessedTx { txid } => {
            to_json_binary(&crate::state::PROCESSED_TXS.has(deps.storage, txid.as_slice()))
        }
        QueryMsg::SigningTx {} => to_json_binary(&SIGNING_TX.may_load(deps.storage)?),
        QueryMsg::SignedTx {} => to_json_binary(&SIGNED_TX.may_load(deps.storage)?),
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(_deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    Ok(Response::default())
}
