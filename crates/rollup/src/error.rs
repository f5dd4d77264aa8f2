use alloy_primitives::U256;
use thiserror::Error;
use zkbnb_signer::{Interrupted, SignerError};

use crate::chain::ChainError;
use crate::request::Operation;

/// Transaction options could not be assembled.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Zero, or too large for EIP-155 `v` encoding.
    #[error("invalid chain id {0}")]
    InvalidChainId(U256),
    #[error("pending nonce lookup failed: {0}")]
    NonceLookup(#[source] ChainError),
}

impl OptionsError {
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::InvalidChainId(_) => false,
            Self::NonceLookup(e) => e.is_retriable(),
        }
    }
}

/// Failure inside a [`RollupContract`](crate::RollupContract) call.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("chain client: {0}")]
    Chain(#[from] ChainError),
    #[error("signer: {0}")]
    Signer(#[from] SignerError),
    #[error("encoding: {0}")]
    Encoding(String),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl ContractError {
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Chain(e) => e.is_retriable(),
            Self::Signer(e) => e.is_retriable(),
            Self::Encoding(_) => false,
            Self::Interrupted(i) => matches!(i, Interrupted::TimedOut(_)),
        }
    }
}

/// Cause of a failed dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("options: {0}")]
    Options(#[from] OptionsError),
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// A rollup call that did not reach broadcast acceptance.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct CallError {
    pub operation: Operation,
    #[source]
    pub source: DispatchError,
}

impl CallError {
    pub fn new(operation: Operation, source: impl Into<DispatchError>) -> Self {
        Self { operation, source: source.into() }
    }

    /// Delegates to the underlying cause. Retrying is left to the caller.
    pub fn is_retriable(&self) -> bool {
        match &self.source {
            DispatchError::Options(e) => e.is_retriable(),
            DispatchError::Contract(e) => e.is_retriable(),
        }
    }

    /// Options construction failed before anything was signed.
    pub fn is_options_failure(&self) -> bool {
        matches!(self.source, DispatchError::Options(_))
    }

    /// Signer error, if the failure came from signing.
    pub fn signer_error(&self) -> Option<&SignerError> {
        match &self.source {
            DispatchError::Contract(ContractError::Signer(e)) => Some(e),
            _ => None,
        }
    }
}
