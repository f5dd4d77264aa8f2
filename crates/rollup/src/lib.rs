//! Authorize and submit transactions to the zkBNB rollup contract.
//!
//! Data flows signer → [`options`] → [`dispatch`] → [`contract`] → [`chain`]:
//! resolve a signing identity once, build [`TransactionOptions`] per call, and
//! [`submit`] a [`RollupOperationRequest`] to get the broadcast hash back.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

/// `ZkBNB` contract ABI types.
pub mod bindings;
pub mod chain;
pub mod contract;
pub mod dispatch;
pub mod envelope;
pub mod error;
/// Prometheus metrics for dispatch.
pub mod metrics;
pub mod options;
pub mod request;

pub use chain::{CallRequest, ChainClient, ChainError, HttpChainClient};
pub use contract::{PendingTransaction, RollupContract, ZkBnbContract};
pub use dispatch::{submit, FeeParams, RollupClient};
pub use envelope::{sign_envelope, SignedEnvelope, UnsignedEnvelope};
pub use error::{CallError, ContractError, DispatchError, OptionsError};
pub use options::{OptionsBuilder, TransactionOptions};
pub use request::{DesertExit, DesertNftExit, Operation, RollupOperationRequest};
