use ethers::contract::ContractError;
use ethers::providers::Middleware;
use ethers::providers::ProviderError;
use ethers::types::H256;
use ethers::types::U256;
use thiserror::Error;

use crate::decode::DecodeError;

/// Failure of a registry read or transaction, normalised across the code,
/// node and task registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Checked before submitting, so no gas is spent on a doomed `add`.
    #[error("Insufficient balance: deposit {required} required, {available} available")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Deposit overflows uint256")]
    DepositOverflow,

    /// The contract rejected the call with a reason.
    #[error("Reverted: {0}")]
    Revert(String),

    /// The transaction was mined with a failure status.
    #[error("Transaction {0:#x} reverted")]
    TxReverted(H256),

    #[error("Transaction {0:#x} dropped before confirmation")]
    Dropped(H256),

    #[error("Failed to decode registry response: {0}")]
    Decode(#[from] DecodeError),

    #[error("{0} does not exist")]
    NotFound(&'static str),

    /// Anything the ledger client reported that is not a classified revert.
    #[error("{0}")]
    Ledger(String),
}

impl<M: Middleware> From<ContractError<M>> for RegistryError {
    fn from(err: ContractError<M>) -> Self {
        if let Some(reason) = err.decode_revert::<String>() {
            return Self::Revert(reason);
        }
        if let Some(data) = err.as_revert() {
            return Self::Revert(format!("unrecognised revert data {data}"));
        }
        match err {
            ContractError::DecodingError(e) => Self::Decode(DecodeError::Abi(e.to_string())),
            ContractError::DetokenizationError(e) => Self::Decode(DecodeError::Abi(e.to_string())),
            other => Self::Ledger(other.to_string()),
        }
    }
}

impl From<ProviderError> for RegistryError {
    fn from(err: ProviderError) -> Self {
        Self::Ledger(err.to_string())
    }
}
