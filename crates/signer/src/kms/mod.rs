//! KMS-backed signing and the signer registry.
//!
//! [`KmsClient`] is the narrow seam to the remote service: sign a digest, fetch a
//! public key. [`RemoteSigner`] layers DER decoding, low-s normalisation and
//! recovery-id search on top of it.
//!
//! Use [`SignerRegistry::from_config`] to load a JSON configuration at runtime.

use core::fmt;
use std::{collections::HashMap, fs, path::Path, sync::Arc, time::Duration};

use alloy_primitives::B256;
#[cfg(feature = "aws")]
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::context::{CallContext, Interrupted, DEFAULT_CALL_TIMEOUT};
use crate::identity::SigningIdentity;
use crate::local::{KeystoreConfig, LocalSigner};
use crate::tx_signer::TxSigner;
use crate::SignerError;

#[cfg(feature = "aws")] mod aws;
mod remote;

#[cfg(feature = "aws")]
pub use aws::AwsKms;
pub use remote::RemoteSigner;

/// Failure reported by a [`KmsClient`].
#[derive(Debug, Error)]
pub enum KmsError {
    #[error("kms api error: {0}")]
    Api(String),
    #[error("kms response missing {0}")]
    MissingField(&'static str),
    #[error("kms key material rejected: {0}")]
    Decode(String),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl KmsError {
    /// Service-side and deadline failures may clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Api(_) | Self::Interrupted(Interrupted::TimedOut(_)))
    }
}

/// Minimal remote asymmetric-key interface.
#[async_trait]
pub trait KmsClient: Send + Sync + 'static {
    /// Sign a 32-byte digest; returns the DER-encoded `(r, s)` pair.
    async fn sign_digest(&self, key_id: &str, digest: B256) -> Result<Vec<u8>, KmsError>;

    /// Public key of `key_id`, either DER `SubjectPublicKeyInfo` or a SEC1 point.
    async fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>, KmsError>;
}

// === Config parsing ========================================================
#[derive(Debug, Deserialize)]
struct SignerFile {
    default_key: String,
    /// Deadline for remote calls made while loading, in milliseconds.
    #[serde(default)]
    timeout_ms: Option<u64>,
    keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
struct KeyEntry {
    name: String,
    #[serde(flatten)]
    cfg: KeyConfig,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
enum KeyConfig {
    /// Local key stored on this host.
    /// At least one of the sources must be provided.
    Local {
        /// Raw hex string (0x…)
        #[serde(default)]
        private_key_hex: Option<String>,
        /// Name of an env var that contains the hex key
        #[serde(default)]
        env_var: Option<String>,
        /// Local keystore file (Web3 JSON). Takes precedence over the other fields.
        #[serde(default)]
        keystore: Option<KeystoreConfig>,
    },
    #[cfg(feature = "aws")]
    Aws {
        region: String,
        key_id: String,
        /// Known address of the key; skips the public key lookup.
        #[serde(default)]
        address: Option<Address>,
    },
    #[cfg(not(feature = "aws"))]
    #[serde(other)]
    _Unsupported,
}

impl KeyConfig {
    #[cfg_attr(not(feature = "aws"), allow(unused_variables))]
    async fn build_identity(self, ctx: &CallContext) -> Result<SigningIdentity, SignerError> {
        match self {
            Self::Local { private_key_hex, env_var, keystore } => {
                if let Some(cfg) = keystore {
                    return Ok(SigningIdentity::from_local(cfg.load()?));
                }
                let pk_hex = if let Some(hex) = private_key_hex {
                    hex
                } else if let Some(var) = env_var {
                    std::env::var(&var).map_err(|_| {
                        SignerError::InvalidKeyMaterial(format!("env var '{var}' is not set"))
                    })?
                } else {
                    return Err(SignerError::InvalidKeyMaterial(
                        "no local key source provided".into(),
                    ));
                };
                Ok(SigningIdentity::from_local(LocalSigner::from_hex(pk_hex)?))
            }
            #[cfg(feature = "aws")]
            Self::Aws { region, key_id, address } => {
                let client: Arc<dyn KmsClient> = Arc::new(AwsKms::from_region(region).await);
                SigningIdentity::resolve_remote(client, key_id, address, ctx).await
            }
            #[allow(unreachable_patterns)]
            _ => Err(SignerError::UnknownBackend("disabled".into())),
        }
    }
}

// === Registry ==============================================================

/// Holds a map of KMS/local signing identities keyed by name.
pub struct SignerRegistry {
    signers: HashMap<String, Arc<SigningIdentity>>,
    default: String,
}

impl fmt::Debug for SignerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&String> = self.signers.keys().collect();
        f.debug_struct("SignerRegistry")
            .field("keys", &keys)
            .field("default", &self.default)
            .finish()
    }
}

impl SignerRegistry {
    /// Load the registry from a JSON configuration file.
    pub async fn from_config(path: impl AsRef<Path>) -> Result<Self, SignerError> {
        let text = fs::read_to_string(&path)?;
        let registry = Self::from_json(&text).await?;
        info!(
            target: "signer",
            "Loaded {} signer(s) from {:?}",
            registry.signers.len(),
            path.as_ref()
        );
        Ok(registry)
    }

    /// Build the registry from the JSON text of a configuration file.
    pub async fn from_json(text: &str) -> Result<Self, SignerError> {
        let file: SignerFile = serde_json::from_str(text)?;
        let timeout = file.timeout_ms.map(Duration::from_millis).unwrap_or(DEFAULT_CALL_TIMEOUT);
        let ctx = CallContext::new(timeout);

        let mut signers = HashMap::with_capacity(file.keys.len());
        for entry in file.keys {
            if signers.contains_key(&entry.name) {
                return Err(SignerError::DuplicateKey(entry.name));
            }
            let identity = entry.cfg.build_identity(&ctx).await?;
            if !identity.is_remote() {
                warn!(
                    target: "signer",
                    "Using local signer '{}'; prefer a KMS key in production",
                    entry.name
                );
            }
            signers.insert(entry.name, Arc::new(identity));
        }

        if !signers.contains_key(&file.default_key) {
            return Err(SignerError::KeyNotFound(file.default_key));
        }
        Ok(Self { signers, default: file.default_key })
    }

    /// Returns the requested identity or the default one if `name` is `None`.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<SigningIdentity>, SignerError> {
        let key = name.unwrap_or(&self.default);
        self.signers
            .get(key)
            .cloned()
            .ok_or_else(|| SignerError::KeyNotFound(key.to_owned()))
    }

    /// Same as [`Self::get`], erased to the signing trait.
    pub fn signer(&self, name: Option<&str>) -> Result<Arc<dyn TxSigner>, SignerError> {
        self.get(name).map(|identity| identity as Arc<dyn TxSigner>)
    }
}
