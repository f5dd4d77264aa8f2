//! Key Material Provider: resolve a secret into a [`SigningIdentity`].

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;

use crate::kms::{KmsClient, RemoteSigner};
use crate::local::LocalSigner;
use crate::tx_signer::TxSigner;
use crate::{CallContext, SignatureTriple, SignerError};

/// Resolved key access method. Chosen once, at identity resolution.
#[derive(Debug, Clone)]
pub enum SigningBackend {
    Local(LocalSigner),
    Remote(RemoteSigner),
}

/// Address plus the means to authorize transactions for it.
///
/// Immutable after construction; share it behind an `Arc` across concurrent
/// submissions.
#[derive(Debug, Clone)]
pub struct SigningIdentity {
    address: Address,
    backend: SigningBackend,
}

impl SigningIdentity {
    /// Identity for a hex-encoded local private key.
    pub fn from_private_key(pk_hex: impl AsRef<str>) -> Result<Self, SignerError> {
        LocalSigner::from_hex(pk_hex).map(Self::from_local)
    }

    pub fn from_local(signer: LocalSigner) -> Self {
        Self { address: signer.address(), backend: SigningBackend::Local(signer) }
    }

    /// Identity for a KMS key. See [`RemoteSigner::resolve`] for how the address is obtained.
    pub async fn resolve_remote(
        client: Arc<dyn KmsClient>,
        key_id: impl Into<String>,
        address: Option<Address>,
        ctx: &CallContext,
    ) -> Result<Self, SignerError> {
        let signer = RemoteSigner::resolve(client, key_id, address, ctx).await?;
        Ok(Self { address: signer.address(), backend: SigningBackend::Remote(signer) })
    }

    pub fn backend(&self) -> &SigningBackend {
        &self.backend
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, SigningBackend::Remote(_))
    }
}

#[async_trait]
impl TxSigner for SigningIdentity {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(
        &self,
        hash: B256,
        ctx: &CallContext,
    ) -> Result<SignatureTriple, SignerError> {
        match &self.backend {
            SigningBackend::Local(s) => s.sign_hash(hash, ctx).await,
            SigningBackend::Remote(s) => s.sign_hash(hash, ctx).await,
        }
    }
}
