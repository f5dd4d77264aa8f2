//! AWS KMS client for `ECC_SECG_P256K1` keys.
//!
//! Enabled with the `aws` crate feature. Relies on the async `aws-sdk-kms`.
#![cfg(feature = "aws")]

use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_kms as kms;
use kms::config::Region as AwsRegion;
use kms::primitives::Blob;
use kms::types::{MessageType, SigningAlgorithmSpec};
use kms::Client;
use tracing::debug;

use super::{KmsClient, KmsError};

/// Thin [`KmsClient`] over the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsKms {
    client: Arc<Client>,
}

impl AwsKms {
    /// Build a client for `region`, falling back to the default provider chain
    /// for credentials and, if the region is empty, for the region as well.
    pub async fn from_region(region: String) -> Self {
        let explicit = (!region.is_empty()).then(|| AwsRegion::new(region));
        let region_provider = RegionProviderChain::first_try(explicit).or_default_provider();
        let cfg = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;
        Self::from_client(Client::new(&cfg))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client: Arc::new(client) }
    }
}

#[async_trait]
impl KmsClient for AwsKms {
    async fn sign_digest(&self, key_id: &str, digest: B256) -> Result<Vec<u8>, KmsError> {
        let resp = self
            .client
            .sign()
            .key_id(key_id)
            .message_type(MessageType::Digest)
            .message(Blob::new(digest.to_vec()))
            .signing_algorithm(SigningAlgorithmSpec::EcdsaSha256)
            .send()
            .await
            .map_err(|e| KmsError::Api(kms::Error::from(e).to_string()))?;
        let der = resp.signature.ok_or(KmsError::MissingField("signature"))?;
        debug!(target: "signer", key_id, len = der.as_ref().len(), "kms signature received");
        Ok(der.into_inner())
    }

    async fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>, KmsError> {
        let resp = self
            .client
            .get_public_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(|e| KmsError::Api(kms::Error::from(e).to_string()))?;
        let der = resp.public_key.ok_or(KmsError::MissingField("public_key"))?;
        Ok(der.into_inner())
    }
}
