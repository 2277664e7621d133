use cosmwasm_std::{StdError, VerificationError};

/// Every error kind admitted handlers in `cw-bitcoin` can raise. A
/// transaction that fails with any of these is simply rejected; CosmWasm
/// discards all storage writes from a handler that returns `Err`, so no
/// explicit rollback is needed (see spec §7, "Error handling design").
#[derive(thiserror::Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),
    #[error(transparent)]
    Verify(#[from] VerificationError),
    #[error(transparent)]
    Bitcoin(#[from] bitcoin::Error),
    #[error(transparent)]
    ParseOutPoint(#[from] bitcoin::blockdata::transaction::ParseOutPointError),
    #[error(transparent)]
    BitcoinAddress(#[from] bitcoin::util::address::Error),
    #[error(transparent)]
    BitcoinHash(#[from] bitcoin::hashes::Error),
    #[error(transparent)]
    BitcoinEncode(#[from] bitcoin::consensus::encode::Error),
    #[error(transparent)]
    Sighash(#[from] bitcoin::util::sighash::Error),
    #[error(transparent)]
    TryFrom(#[from] std::num::TryFromIntError),
    #[error(transparent)]
    Secp(#[from] bitcoin::secp256k1::Error),

    #[error("bad format: {0}")]
    BadFormat(String),
    #[error("signature does not verify")]
    BadSignature,
    #[error("index {0} is out of bounds for the current signatory set")]
    BadIndex(u32),
    #[error("no header at height {0}")]
    UnknownHeight(u32),
    #[error("merkle proof did not verify: {0}")]
    BadProof(String),
    #[error("transaction already processed")]
    AlreadyProcessed,
    #[error("signatory has already submitted a signature for this transaction")]
    AlreadySigned,
    #[error("transaction does not pay the current P2SS address")]
    NotPeggedPayment,
    #[error("transaction is missing a recipient commitment output")]
    MissingCommitment,
    #[error("disbursal would leave no funds for the change output")]
    InsufficientFunds,
    #[error("output value would be non-positive after fee deduction")]
    OutputBelowFee,
    #[error("signatory set is empty, no current P2SS address")]
    EmptySignatorySet,
    #[error("header chain error: {0}")]
    Header(String),
    #[error("app error: {0}")]
    App(String),
}

impl From<ContractError> for StdError {
    fn from(source: ContractError) -> Self {
        Self::generic_err(source.to_string())
    }
}

pub type ContractResult<T> = std::result::Result<T, ContractError>;
