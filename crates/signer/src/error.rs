use alloy_primitives::Address;

use crate::context::Interrupted;
use crate::kms::KmsError;
use crate::local::KeystoreError;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown backend '{0}' (feature disabled)")]
    UnknownBackend(String),
    #[error("key '{0}' not found in registry")]
    KeyNotFound(String),
    #[error("duplicate key name '{0}' in config file")]
    DuplicateKey(String),
    #[error("keystore error: {0}")]
    Keystore(#[from] KeystoreError),
    /// Malformed, zero or out-of-range private key. Supply a different key.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
    /// Remote public key lookup failed. Retriable when the cause is transient.
    #[error("key resolution failed for '{key_id}': {source}")]
    KeyResolutionFailed {
        key_id: String,
        #[source]
        source: KmsError,
    },
    #[error("signing failed: {0}")]
    SigningFailed(#[from] SigningFailure),
}

/// Cause of a failed `sign_hash`.
#[derive(Debug, thiserror::Error)]
pub enum SigningFailure {
    /// Neither recovery id recovers the expected address. Retrying with the
    /// same inputs reproduces it; needs operator intervention.
    #[error("recovery mismatch: no recovery id yields {expected}")]
    RecoveryMismatch { expected: Address },
    #[error("malformed DER signature: {0}")]
    MalformedDer(String),
    #[error("remote signer: {0}")]
    Remote(#[source] KmsError),
    #[error("local signer: {0}")]
    Local(String),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl SignerError {
    /// Whether the same request may succeed if issued again later.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::KeyResolutionFailed { source, .. } => source.is_transient(),
            Self::SigningFailed(SigningFailure::Remote(e)) => e.is_transient(),
            Self::SigningFailed(SigningFailure::Interrupted(Interrupted::TimedOut(_))) => true,
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// Recovery mismatch is an integrity failure, not a transport hiccup.
    pub fn is_recovery_mismatch(&self) -> bool {
        matches!(self, Self::SigningFailed(SigningFailure::RecoveryMismatch { .. }))
    }
}
