//! Transaction options: who signs, on which chain, at what nonce and price.
//!
//! Options are built once per call and consumed by exactly one dispatch. The
//! chain id is always passed in explicitly; nothing here reads ambient network
//! state.
//!
//! Leaving the nonce unset makes [`OptionsBuilder::build`] ask the node for
//! the signer's pending nonce. Two submissions from the same address that do
//! this concurrently can observe the same nonce and one will be rejected at
//! broadcast. Callers pipelining submissions must allocate nonces themselves
//! and pass them through [`OptionsBuilder::nonce`].

use core::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::debug;
use zkbnb_signer::{CallContext, EnvelopeFormat, TxSigner};

use crate::chain::{with_context, ChainClient};
use crate::error::OptionsError;

/// Complete parameter set to price and authorize one transaction.
#[derive(Clone)]
pub struct TransactionOptions {
    signer: Arc<dyn TxSigner>,
    from: Address,
    chain_id: U256,
    nonce: u64,
    gas_price: Option<U256>,
    gas_limit: u64,
    format: EnvelopeFormat,
    context: CallContext,
}

impl TransactionOptions {
    pub fn builder(signer: Arc<dyn TxSigner>, chain_id: U256) -> OptionsBuilder {
        OptionsBuilder {
            signer,
            chain_id,
            nonce: None,
            gas_price: None,
            gas_limit: 0,
            format: EnvelopeFormat::default(),
            context: CallContext::default(),
        }
    }

    /// Signing function bound to these options.
    pub fn signer(&self) -> &Arc<dyn TxSigner> {
        &self.signer
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn chain_id(&self) -> U256 {
        self.chain_id
    }

    /// Chain id as used in EIP-155 and typed envelopes. Checked at build time.
    pub fn chain_id_u64(&self) -> u64 {
        self.chain_id.to::<u64>()
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// `None` means the node's suggested price is used at dispatch.
    pub fn gas_price(&self) -> Option<U256> {
        self.gas_price
    }

    /// `0` means the limit is estimated at dispatch.
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn format(&self) -> EnvelopeFormat {
        self.format
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }
}

impl fmt::Debug for TransactionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionOptions")
            .field("from", &self.from)
            .field("chain_id", &self.chain_id)
            .field("nonce", &self.nonce)
            .field("gas_price", &self.gas_price)
            .field("gas_limit", &self.gas_limit)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Signer handle and context are not compared; the signing address is.
impl PartialEq for TransactionOptions {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from &&
            self.chain_id == other.chain_id &&
            self.nonce == other.nonce &&
            self.gas_price == other.gas_price &&
            self.gas_limit == other.gas_limit &&
            self.format == other.format
    }
}

impl Eq for TransactionOptions {}

/// Builder for [`TransactionOptions`].
#[must_use]
pub struct OptionsBuilder {
    signer: Arc<dyn TxSigner>,
    chain_id: U256,
    nonce: Option<u64>,
    gas_price: Option<U256>,
    gas_limit: u64,
    format: EnvelopeFormat,
    context: CallContext,
}

impl OptionsBuilder {
    /// Explicit nonce, used verbatim. `None` fetches the pending nonce.
    pub fn nonce(mut self, nonce: impl Into<Option<u64>>) -> Self {
        self.nonce = nonce.into();
        self
    }

    /// Explicit gas price. `None` defers to the node's suggestion.
    pub fn gas_price(mut self, gas_price: impl Into<Option<U256>>) -> Self {
        self.gas_price = gas_price.into();
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn format(mut self, format: EnvelopeFormat) -> Self {
        self.format = format;
        self
    }

    /// Deadline and cancellation for every remote call made with these options.
    pub fn context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    /// Validate inputs and resolve the nonce.
    ///
    /// Performs exactly one `pending_nonce` lookup when no nonce was set and
    /// none otherwise.
    pub async fn build<C>(self, chain: &C) -> Result<TransactionOptions, OptionsError>
    where
        C: ChainClient + ?Sized,
    {
        let Self { signer, chain_id, nonce, gas_price, gas_limit, format, context } = self;
        if chain_id.is_zero() || chain_id > U256::from(u64::MAX) {
            return Err(OptionsError::InvalidChainId(chain_id));
        }

        let from = signer.address();
        let nonce = match nonce {
            Some(nonce) => nonce,
            None => {
                let nonce = with_context(&context, chain.pending_nonce(from))
                    .await
                    .map_err(OptionsError::NonceLookup)?;
                debug!(target: "rollup::options", %from, nonce, "fetched pending nonce");
                nonce
            }
        };

        Ok(TransactionOptions {
            signer,
            from,
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            format,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{CallRequest, ChainError};
    use alloy_primitives::{address, Bytes, B256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use zkbnb_signer::{Interrupted, SigningIdentity};

    #[derive(Default)]
    struct NonceOnly {
        lookups: AtomicUsize,
        stall: bool,
    }

    #[async_trait]
    impl ChainClient for NonceOnly {
        async fn pending_nonce(&self, _address: Address) -> Result<u64, ChainError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(42)
        }

        async fn suggest_gas_price(&self) -> Result<U256, ChainError> {
            unreachable!("options never price")
        }

        async fn estimate_gas(&self, _call: &CallRequest) -> Result<u64, ChainError> {
            unreachable!("options never estimate")
        }

        async fn broadcast(&self, _raw: Bytes) -> Result<B256, ChainError> {
            unreachable!("options never broadcast")
        }
    }

    fn signer() -> Arc<dyn TxSigner> {
        Arc::new(SigningIdentity::from_private_key(format!("{:064x}", 1)).unwrap())
    }

    #[tokio::test]
    async fn unset_nonce_is_fetched_once() {
        let chain = NonceOnly::default();
        let opts =
            TransactionOptions::builder(signer(), U256::from(56)).build(&chain).await.unwrap();
        assert_eq!(opts.nonce(), 42);
        assert_eq!(opts.from(), address!("7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
        assert_eq!(chain.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn explicit_nonce_skips_lookup() {
        let chain = NonceOnly::default();
        let opts = TransactionOptions::builder(signer(), U256::from(56))
            .nonce(5)
            .gas_price(U256::from(1_000_000_000u64))
            .gas_limit(21_000)
            .build(&chain)
            .await
            .unwrap();
        assert_eq!(chain.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(opts.nonce(), 5);
        assert_eq!(opts.gas_price(), Some(U256::from(1_000_000_000u64)));
        assert_eq!(opts.gas_limit(), 21_000);
        assert_eq!(opts.chain_id_u64(), 56);
    }

    #[tokio::test]
    async fn defaults_defer_pricing_to_dispatch() {
        let opts = TransactionOptions::builder(signer(), U256::from(97))
            .nonce(0)
            .build(&NonceOnly::default())
            .await
            .unwrap();
        assert_eq!(opts.gas_price(), None);
        assert_eq!(opts.gas_limit(), 0);
        assert_eq!(opts.format(), EnvelopeFormat::Legacy);
    }

    #[tokio::test]
    async fn chain_id_must_be_nonzero_and_fit_u64() {
        let chain = NonceOnly::default();
        for bad in [U256::ZERO, U256::from(u64::MAX) + U256::from(1)] {
            let err = TransactionOptions::builder(signer(), bad).build(&chain).await.unwrap_err();
            assert!(matches!(err, OptionsError::InvalidChainId(id) if id == bad));
        }
        assert_eq!(chain.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stalled_lookup_times_out() {
        let chain = NonceOnly { stall: true, ..Default::default() };
        let err = TransactionOptions::builder(signer(), U256::from(56))
            .context(CallContext::new(Duration::from_millis(20)))
            .build(&chain)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OptionsError::NonceLookup(ChainError::Interrupted(Interrupted::TimedOut(_)))
        ));
        assert!(err.is_retriable());
    }
}
