//! Call Dispatcher: route a [`RollupOperationRequest`] to its contract entry
//! point and report the broadcast transaction hash.
//!
//! No retries happen here. A [`CallError`] carries the failing operation and
//! the original cause so the caller can decide whether to refresh the nonce,
//! bump the gas price or give up.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::{aliases::U40, hex, Address, Bytes, U256};
use tracing::{debug, error};
use zkbnb_signer::{CallContext, EnvelopeFormat, TxSigner, DEFAULT_CALL_TIMEOUT};

use crate::bindings::{CommitBlockInfo, StoredBlockInfo, VerifyAndExecuteBlockInfo};
use crate::chain::ChainClient;
use crate::contract::{RollupContract, ZkBnbContract};
use crate::error::{CallError, OptionsError};
use crate::metrics::DispatchMetrics;
use crate::options::TransactionOptions;
use crate::request::{DesertExit, DesertNftExit, RollupOperationRequest};

/// Submit `request` through `contract` with `options`.
///
/// Returns the transaction hash as `0x`-prefixed lowercase hex once the node
/// accepts the transaction.
pub async fn submit<R>(
    contract: &R,
    options: TransactionOptions,
    request: RollupOperationRequest,
) -> Result<String, CallError>
where
    R: RollupContract + ?Sized,
{
    let operation = request.operation();
    let metrics = DispatchMetrics::for_operation(operation);
    let nonce = options.nonce();
    let start = Instant::now();

    let res = match request {
        RollupOperationRequest::CommitBlocks { last_block, blocks } => {
            contract.commit_blocks(options, last_block, blocks).await
        }
        RollupOperationRequest::VerifyAndExecuteBlocks { blocks, proofs } => {
            contract.verify_and_execute_blocks(options, blocks, proofs).await
        }
        RollupOperationRequest::RevertBlocks { blocks } => {
            contract.revert_blocks(options, blocks).await
        }
        RollupOperationRequest::PerformDesert(exit) => {
            contract.perform_desert(options, *exit).await
        }
        RollupOperationRequest::PerformDesertNft(exit) => {
            contract.perform_desert_nft(options, *exit).await
        }
        RollupOperationRequest::WithdrawPendingBalance { owner, token, amount } => {
            contract.withdraw_pending_balance(options, owner, token, amount).await
        }
        RollupOperationRequest::WithdrawPendingNftBalance { nft_index } => {
            contract.withdraw_pending_nft_balance(options, nft_index).await
        }
        RollupOperationRequest::CancelOutstandingDeposits { n, deposits_pub_data } => {
            contract
                .cancel_outstanding_deposits_for_desert_mode(options, n, deposits_pub_data)
                .await
        }
        RollupOperationRequest::ActivateDesertMode => contract.activate_desert_mode(options).await,
    };

    match res {
        Ok(pending) => {
            metrics.submissions_total.increment(1);
            metrics.submit_duration_seconds.record(start.elapsed().as_secs_f64());
            let tx_hash = hex::encode_prefixed(pending.hash);
            debug!(target: "rollup::dispatch", %operation, nonce, %tx_hash, "submitted");
            Ok(tx_hash)
        }
        Err(source) => {
            metrics.failures_total.increment(1);
            let err = CallError::new(operation, source);
            error!(
                target: "rollup::dispatch",
                %operation,
                nonce,
                retriable = err.is_retriable(),
                %err,
                "rollup call failed"
            );
            Err(err)
        }
    }
}

/// Whether building options went to the node for the pending nonce.
fn looked_up_nonce(fees: &FeeParams, built: &Result<TransactionOptions, OptionsError>) -> bool {
    fees.nonce.is_none() && matches!(built, Ok(_) | Err(OptionsError::NonceLookup(_)))
}

/// Fee and ordering inputs for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeParams {
    /// `None` uses the node's suggested price.
    pub gas_price: Option<U256>,
    /// `0` estimates the limit.
    pub gas_limit: u64,
    /// `None` fetches the pending nonce; unsafe when the same address submits concurrently.
    pub nonce: Option<u64>,
}

impl FeeParams {
    pub fn new(gas_price: impl Into<Option<U256>>, gas_limit: u64) -> Self {
        Self { gas_price: gas_price.into(), gas_limit, nonce: None }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// Signer, chain and contract bundled for repeated submissions.
///
/// Every call builds fresh [`TransactionOptions`] and hands them to
/// [`submit`]. Calls that leave [`FeeParams::nonce`] unset are only safe when
/// this client is the single writer for its address.
pub struct RollupClient<C, R> {
    chain: Arc<C>,
    contract: R,
    signer: Arc<dyn TxSigner>,
    chain_id: U256,
    format: EnvelopeFormat,
    timeout: Duration,
}

impl<C: ChainClient> RollupClient<C, ZkBnbContract<Arc<C>>> {
    /// Client for the `ZkBNB` contract deployed at `address`.
    pub fn connect(
        chain: Arc<C>,
        address: Address,
        signer: Arc<dyn TxSigner>,
        chain_id: U256,
    ) -> Self {
        let contract = ZkBnbContract::load(chain.clone(), address);
        Self::new(chain, contract, signer, chain_id)
    }
}

impl<C, R> RollupClient<C, R>
where
    C: ChainClient,
    R: RollupContract,
{
    pub fn new(chain: Arc<C>, contract: R, signer: Arc<dyn TxSigner>, chain_id: U256) -> Self {
        Self {
            chain,
            contract,
            signer,
            chain_id,
            format: EnvelopeFormat::Legacy,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_format(mut self, format: EnvelopeFormat) -> Self {
        self.format = format;
        self
    }

    /// Per-remote-call deadline used by the convenience methods.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn signer(&self) -> &Arc<dyn TxSigner> {
        &self.signer
    }

    pub fn contract(&self) -> &R {
        &self.contract
    }

    /// Build options for `fees` under `ctx` and submit `request`.
    pub async fn dispatch(
        &self,
        request: RollupOperationRequest,
        fees: FeeParams,
        ctx: CallContext,
    ) -> Result<String, CallError> {
        let operation = request.operation();
        let built = TransactionOptions::builder(self.signer.clone(), self.chain_id)
            .nonce(fees.nonce)
            .gas_price(fees.gas_price)
            .gas_limit(fees.gas_limit)
            .format(self.format)
            .context(ctx)
            .build(self.chain.as_ref())
            .await;
        let metrics = DispatchMetrics::for_operation(operation);
        if looked_up_nonce(&fees, &built) {
            metrics.nonce_lookups_total.increment(1);
        }
        let options = built.map_err(|e| {
            metrics.failures_total.increment(1);
            error!(
                target: "rollup::dispatch",
                %operation,
                %e,
                "building transaction options failed"
            );
            CallError::new(operation, e)
        })?;
        submit(&self.contract, options, request).await
    }

    async fn dispatch_default(
        &self,
        request: RollupOperationRequest,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        self.dispatch(request, fees, CallContext::new(self.timeout)).await
    }

    pub async fn commit_blocks(
        &self,
        last_block: StoredBlockInfo,
        blocks: Vec<CommitBlockInfo>,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        let request = RollupOperationRequest::CommitBlocks { last_block, blocks };
        self.dispatch_default(request, fees).await
    }

    pub async fn verify_and_execute_blocks(
        &self,
        blocks: Vec<VerifyAndExecuteBlockInfo>,
        proofs: Vec<U256>,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        let request = RollupOperationRequest::VerifyAndExecuteBlocks { blocks, proofs };
        self.dispatch_default(request, fees).await
    }

    pub async fn revert_blocks(
        &self,
        blocks: Vec<StoredBlockInfo>,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        self.dispatch_default(RollupOperationRequest::RevertBlocks { blocks }, fees).await
    }

    pub async fn perform_desert(
        &self,
        exit: DesertExit,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        self.dispatch_default(RollupOperationRequest::PerformDesert(Box::new(exit)), fees).await
    }

    pub async fn perform_desert_nft(
        &self,
        exit: DesertNftExit,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        self.dispatch_default(RollupOperationRequest::PerformDesertNft(Box::new(exit)), fees).await
    }

    pub async fn withdraw_pending_balance(
        &self,
        owner: Address,
        token: Address,
        amount: u128,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        let request = RollupOperationRequest::WithdrawPendingBalance { owner, token, amount };
        self.dispatch_default(request, fees).await
    }

    pub async fn withdraw_pending_nft_balance(
        &self,
        nft_index: U40,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        let request = RollupOperationRequest::WithdrawPendingNftBalance { nft_index };
        self.dispatch_default(request, fees).await
    }

    pub async fn cancel_outstanding_deposits(
        &self,
        n: u64,
        deposits_pub_data: Vec<Bytes>,
        fees: FeeParams,
    ) -> Result<String, CallError> {
        let request = RollupOperationRequest::CancelOutstandingDeposits { n, deposits_pub_data };
        self.dispatch_default(request, fees).await
    }

    pub async fn activate_desert_mode(&self, fees: FeeParams) -> Result<String, CallError> {
        self.dispatch_default(RollupOperationRequest::ActivateDesertMode, fees).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_params_default_to_node_pricing() {
        let fees = FeeParams::default();
        assert_eq!(fees.gas_price, None);
        assert_eq!(fees.gas_limit, 0);
        assert_eq!(fees.nonce, None);
    }

    #[test]
    fn fee_params_builder() {
        let fees = FeeParams::new(U256::from(5_000_000_000u64), 400_000).with_nonce(12);
        assert_eq!(fees.gas_price, Some(U256::from(5_000_000_000u64)));
        assert_eq!(fees.gas_limit, 400_000);
        assert_eq!(fees.nonce, Some(12));
        assert_eq!(FeeParams::new(None, 21_000).gas_price, None);
    }

    #[test]
    fn rejected_chain_id_is_not_a_nonce_lookup() {
        let auto = FeeParams::default();
        let invalid: Result<TransactionOptions, _> = Err(OptionsError::InvalidChainId(U256::ZERO));
        assert!(!looked_up_nonce(&auto, &invalid));

        let failed: Result<TransactionOptions, _> =
            Err(OptionsError::NonceLookup(crate::chain::ChainError::Decode("bad hex".into())));
        assert!(looked_up_nonce(&auto, &failed));
        assert!(!looked_up_nonce(&auto.with_nonce(3), &failed));
    }
}
