//! Web3 (Ethereum V3) keystore file support.

use std::path::PathBuf;

use alloy_signer_local::PrivateKeySigner;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::LocalSigner;

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("no keystore password configured for {0}")]
    MissingPassword(PathBuf),
    #[error("password env var '{0}' is not set")]
    PasswordEnv(String),
    #[error("decrypt error: {0}")]
    Decrypt(String),
}

/// JSON-serialisable keystore config section.
#[derive(Debug, Clone, Deserialize)]
pub struct KeystoreConfig {
    /// Path to the keystore JSON file on disk.
    pub path: PathBuf,
    /// Environment variable containing the password.
    #[serde(default)]
    pub password_env: Option<String>,
    /// Clear-text password (discouraged; dev only).
    #[serde(default)]
    pub password: Option<String>,
}

impl KeystoreConfig {
    fn password(&self) -> Result<String, KeystoreError> {
        if let Some(var) = &self.password_env {
            return std::env::var(var).map_err(|_| KeystoreError::PasswordEnv(var.clone()));
        }
        if let Some(pw) = &self.password {
            warn!(
                target: "signer",
                path = %self.path.display(),
                "keystore password given in clear text"
            );
            return Ok(pw.clone());
        }
        Err(KeystoreError::MissingPassword(self.path.clone()))
    }

    /// Decrypt the keystore into a local signer.
    pub fn load(&self) -> Result<LocalSigner, KeystoreError> {
        let password = self.password()?;
        let signer = PrivateKeySigner::decrypt_keystore(&self.path, password)
            .map_err(|e| KeystoreError::Decrypt(e.to_string()))?;
        debug!(target: "signer", address = %signer.address(), "decrypted keystore");
        Ok(LocalSigner::from_signer(signer))
    }
}
