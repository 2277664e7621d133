use cosmwasm_schema::cw_serde;
use cosmwasm_std::Addr;

use crate::error::ContractResult;

/// A validator as seen by the core at a given block: an ed25519 consensus
/// key and its voting power (spec §3 "Validator").
#[derive(Clone, Copy, Debug, PartialEq, Eq, cosmwasm_schema::serde::Serialize, cosmwasm_schema::serde::Deserialize)]
#[serde(crate = "cosmwasm_schema::serde")]
pub struct Validator {
    pub pubkey: [u8; 32],
    pub power: u64,
}

/// The sidechain recipient of a deposit, carried in a deposit transaction's
/// commitment output (spec §4.D.6, §9 open question resolved in
/// `SPEC_FULL.md` §4: `1 byte length | UTF-8 address bytes`).
#[cw_serde]
pub struct Dest(pub Addr);

impl Dest {
    /// Serializes the commitment exactly as the deposit verifier expects to
    /// find it in the OP_RETURN output: a single length byte followed by the
    /// address's UTF-8 bytes.
    pub fn commitment_bytes(&self) -> ContractResult<Vec<u8>> {
        let addr = self.0.as_str().as_bytes();
        let len: u8 = addr
            .len()
            .try_into()
            .map_err(|_| crate::error::ContractError::BadFormat("address too long".into()))?;

        let mut bytes = Vec::with_capacity(1 + addr.len());
        bytes.push(len);
        bytes.extend_from_slice(addr);
        Ok(bytes)
    }

    /// Parses a commitment payload back into a recipient address. Used by
    /// the deposit verifier when reading the OP_RETURN output of a deposit
    /// transaction.
    pub fn from_commitment_bytes(bytes: &[u8]) -> ContractResult<Self> {
        let (len, rest) = bytes
            .split_first()
            .ok_or(crate::error::ContractError::MissingCommitment)?;
        let len = *len as usize;

        if rest.len() != len {
            return Err(crate::error::ContractError::BadFormat(
                "commitment length prefix does not match payload".into(),
            ));
        }

        let addr =
            std::str::from_utf8(rest).map_err(|_| {
                crate::error::ContractError::BadFormat("commitment is not valid UTF-8".into())
            })?;

        Ok(Dest(Addr::unchecked(addr)))
    }
}
