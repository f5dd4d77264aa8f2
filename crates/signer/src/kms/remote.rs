//! Remote (KMS-held) secp256k1 signer.
//!
//! The KMS returns a DER `(r, s)` with no recovery id. The signer folds `s` into
//! the lower half of the order and then searches recovery ids 0 and 1 for the
//! one that recovers the identity's address.

use core::fmt;
use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use k256::ecdsa::Signature;
use tracing::{debug, error, info};

use super::{KmsClient, KmsError};
use crate::context::{CallContext, Interrupted};
use crate::metrics::SignerMetrics;
use crate::tx_signer::TxSigner;
use crate::util::{address_from_public_key, find_recovery_id, normalize_s};
use crate::{SignatureTriple, SignerError, SigningFailure};

/// Signer whose private scalar never leaves the KMS.
#[derive(Clone)]
pub struct RemoteSigner {
    client: Arc<dyn KmsClient>,
    key_id: String,
    address: Address,
    metrics: SignerMetrics,
}

impl fmt::Debug for RemoteSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSigner")
            .field("key_id", &self.key_id)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl RemoteSigner {
    /// Bind `key_id` to its address.
    ///
    /// A supplied `address` is trusted verbatim. Otherwise the public key is
    /// fetched once and hashed the same way a local key is.
    pub async fn resolve(
        client: Arc<dyn KmsClient>,
        key_id: impl Into<String>,
        address: Option<Address>,
        ctx: &CallContext,
    ) -> Result<Self, SignerError> {
        let key_id = key_id.into();
        let address = match address {
            Some(address) => address,
            None => fetch_address(client.as_ref(), &key_id, ctx)
                .await
                .map_err(|source| SignerError::KeyResolutionFailed {
                    key_id: key_id.clone(),
                    source,
                })?,
        };
        info!(target: "signer", %key_id, %address, "resolved KMS signing key");
        Ok(Self { client, key_id, address, metrics: SignerMetrics::default() })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Turn a KMS DER signature into a canonical triple for `hash`.
    pub fn der_to_triple(
        &self,
        hash: &B256,
        der: &[u8],
    ) -> Result<SignatureTriple, SigningFailure> {
        let sig =
            Signature::from_der(der).map_err(|e| SigningFailure::MalformedDer(e.to_string()))?;
        let r = U256::from_be_slice(&sig.r().to_bytes());
        let (s, flipped) = normalize_s(U256::from_be_slice(&sig.s().to_bytes()));
        if flipped {
            self.metrics.kms_high_s_normalized_total.increment(1);
            debug!(target: "signer", key_id = %self.key_id, "normalized high-s KMS signature");
        }

        match find_recovery_id(hash, &r.to_be_bytes::<32>(), &s.to_be_bytes::<32>(), self.address) {
            Some(recovery_id) => Ok(SignatureTriple { r, s, recovery_id }),
            None => {
                self.metrics.kms_recovery_mismatch_total.increment(1);
                error!(
                    target: "signer",
                    key_id = %self.key_id,
                    expected = %self.address,
                    ?hash,
                    "KMS signature does not recover to the configured address"
                );
                Err(SigningFailure::RecoveryMismatch { expected: self.address })
            }
        }
    }

    async fn sign_remote(
        &self,
        hash: B256,
        ctx: &CallContext,
    ) -> Result<SignatureTriple, SigningFailure> {
        let der = match ctx.run(self.client.sign_digest(&self.key_id, hash)).await {
            Ok(Ok(der)) => der,
            Ok(Err(e)) => return Err(SigningFailure::Remote(e)),
            Err(interrupted) => {
                if matches!(interrupted, Interrupted::TimedOut(_)) {
                    self.metrics.kms_sign_timeout_total.increment(1);
                }
                return Err(interrupted.into());
            }
        };
        self.der_to_triple(&hash, &der)
    }
}

async fn fetch_address(
    client: &dyn KmsClient,
    key_id: &str,
    ctx: &CallContext,
) -> Result<Address, KmsError> {
    let public_key = ctx.run(client.get_public_key(key_id)).await??;
    address_from_public_key(&public_key)
        .ok_or_else(|| KmsError::Decode("public key is not a secp256k1 point".into()))
}

#[async_trait]
impl TxSigner for RemoteSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(
        &self,
        hash: B256,
        ctx: &CallContext,
    ) -> Result<SignatureTriple, SignerError> {
        let start = Instant::now();
        let res = self.sign_remote(hash, ctx).await;
        self.metrics.kms_sign_latency_seconds.record(start.elapsed().as_secs_f64());
        match res {
            Ok(sig) => {
                self.metrics.kms_sign_success_total.increment(1);
                Ok(sig)
            }
            Err(failure) => {
                self.metrics.kms_sign_failure_total.increment(1);
                Err(failure.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{SECP256K1_HALF_N, SECP256K1_N};
    use k256::ecdsa::SigningKey;
    use proptest::prelude::*;

    /// Never reached: `der_to_triple` is a pure function of the returned bytes.
    struct Offline;

    #[async_trait]
    impl KmsClient for Offline {
        async fn sign_digest(&self, _key_id: &str, _digest: B256) -> Result<Vec<u8>, KmsError> {
            Err(KmsError::Api("offline".into()))
        }

        async fn get_public_key(&self, _key_id: &str) -> Result<Vec<u8>, KmsError> {
            Err(KmsError::Api("offline".into()))
        }
    }

    fn signer_for(key: &SigningKey) -> RemoteSigner {
        RemoteSigner {
            client: Arc::new(Offline),
            key_id: "alias/test".into(),
            address: crate::util::address_from_verifying_key(key.verifying_key()),
            metrics: SignerMetrics::default(),
        }
    }

    fn valid_key() -> impl Strategy<Value = SigningKey> {
        any::<[u8; 32]>().prop_filter_map("scalar must be non-zero and below n", |bytes| {
            SigningKey::from_slice(&bytes).ok()
        })
    }

    fn with_s(sig: &Signature, s: U256) -> Signature {
        let mut raw = [0u8; 64];
        raw[..32].copy_from_slice(&sig.r().to_bytes());
        raw[32..].copy_from_slice(&s.to_be_bytes::<32>());
        Signature::from_slice(&raw).unwrap()
    }

    proptest! {
        #[test]
        fn der_in_either_half_yields_canonical_recoverable_triple(
            key in valid_key(),
            digest in any::<[u8; 32]>(),
            upper_half in any::<bool>(),
        ) {
            let hash = B256::from(digest);
            let (low, rid) = key.sign_prehash_recoverable(hash.as_slice()).unwrap();
            let low_s = U256::from_be_slice(&low.s().to_bytes());
            prop_assert!(low_s <= SECP256K1_HALF_N);
            let submitted = if upper_half { with_s(&low, SECP256K1_N - low_s) } else { low };
            let der = submitted.to_der();

            let signer = signer_for(&key);
            let triple = signer.der_to_triple(&hash, der.as_bytes()).unwrap();

            prop_assert!(triple.is_canonical());
            prop_assert_eq!(triple.s, low_s);
            prop_assert_eq!(triple.r, U256::from_be_slice(&low.r().to_bytes()));
            // The search only spans ids 0 and 1, so a hit is within two attempts.
            prop_assert_eq!(triple.recovery_id, rid.to_byte());
            prop_assert_eq!(triple.recover_address(&hash), Some(signer.address()));
        }

        #[test]
        fn der_from_another_key_never_recovers(
            key in valid_key(),
            other in valid_key(),
            digest in any::<[u8; 32]>(),
        ) {
            prop_assume!(key != other);
            let hash = B256::from(digest);
            let (sig, _) = other.sign_prehash_recoverable(hash.as_slice()).unwrap();
            let err = signer_for(&key).der_to_triple(&hash, sig.to_der().as_bytes()).unwrap_err();
            prop_assert!(
                matches!(err, SigningFailure::RecoveryMismatch { .. }),
                "unexpected failure: {:?}",
                err
            );
        }
    }
}
