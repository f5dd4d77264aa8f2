//! Transaction signers for zkBNB rollup submission.
//!
//! Exposes:
//! * `identity`: the resolved signing identity (address + backend)
//! * `tx_signer`: trait shared by the local and remote backends
//! * `local`: in-process secp256k1 key (hex or Web3 keystore)
//! * `kms`: remote KMS backend and the JSON signer registry
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod context;
pub mod error;
pub mod identity;
pub mod kms;
pub mod local;
pub mod metrics;
pub mod signature;
pub mod tx_signer;
/// Curve helpers: low-s normalisation, recovery-id search, address derivation.
pub mod util;

pub use context::{CallContext, Interrupted, DEFAULT_CALL_TIMEOUT};
pub use error::{SignerError, SigningFailure};
pub use identity::{SigningBackend, SigningIdentity};
pub use kms::{KmsClient, KmsError, RemoteSigner, SignerRegistry};
pub use local::LocalSigner;
pub use signature::{EnvelopeFormat, SignatureTriple};
pub use tx_signer::TxSigner;
