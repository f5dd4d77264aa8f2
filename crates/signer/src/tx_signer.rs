//! Trait for authorizing rollup transactions.
//!
//! The signer receives the signing hash of an unsigned transaction envelope and
//! returns a canonical (low-s) signature with a 0/1 recovery id. Converting the
//! recovery id into the wire `v` is left to the envelope encoder, see
//! [`SignatureTriple::v`](crate::SignatureTriple::v).
//!
//! Implementations hold read-only key material; a single instance can be shared
//! across concurrent submissions without locking.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;

use crate::{CallContext, SignatureTriple, SignerError};

/// A type that can sign transaction hashes and expose its Ethereum address.
#[async_trait]
pub trait TxSigner: Send + Sync + 'static {
    /// Returns the 20-byte address corresponding to the signer public key.
    fn address(&self) -> Address;

    /// Signs the given transaction signing hash. Remote backends honour `ctx`
    /// for cancellation and timeout; local signing completes synchronously.
    async fn sign_hash(
        &self,
        hash: B256,
        ctx: &CallContext,
    ) -> Result<SignatureTriple, SignerError>;
}
