//! Local signer backend.
//! Key material lives in process memory; prefer a KMS key for production operators.

use alloy_primitives::{hex, Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use crate::tx_signer::TxSigner;
use crate::{CallContext, SignatureTriple, SignerError, SigningFailure};

mod keystore;
pub use keystore::{KeystoreConfig, KeystoreError};

/// Local signer backed by an in-memory secp256k1 private key.
#[derive(Clone, Debug)]
pub struct LocalSigner(PrivateKeySigner);

impl LocalSigner {
    /// Parse a hex private key (`0x` optional). Exactly 32 bytes, non-zero and
    /// below the curve order.
    pub fn from_hex(pk_hex: impl AsRef<str>) -> Result<Self, SignerError> {
        let pk_hex = pk_hex.as_ref().trim();
        let pk_hex = pk_hex.strip_prefix("0x").unwrap_or(pk_hex);
        let bytes = hex::decode(pk_hex)
            .map_err(|e| SignerError::InvalidKeyMaterial(format!("not hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(SignerError::InvalidKeyMaterial(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let signer = PrivateKeySigner::from_slice(&bytes).map_err(|_| {
            SignerError::InvalidKeyMaterial("scalar is zero or not below the curve order".into())
        })?;
        Ok(Self(signer))
    }

    pub(crate) fn from_signer(signer: PrivateKeySigner) -> Self {
        Self(signer)
    }

    /// Deterministic (RFC6979) signature over a prehashed digest.
    pub fn sign_hash_sync(&self, hash: &B256) -> Result<SignatureTriple, SignerError> {
        let sig = self
            .0
            .sign_hash_sync(hash)
            .map_err(|e| SigningFailure::Local(e.to_string()))?;
        Ok(SignatureTriple::from(&sig))
    }
}

#[async_trait]
impl TxSigner for LocalSigner {
    fn address(&self) -> Address {
        self.0.address()
    }

    async fn sign_hash(
        &self,
        hash: B256,
        _ctx: &CallContext,
    ) -> Result<SignatureTriple, SignerError> {
        self.sign_hash_sync(&hash)
    }
}
