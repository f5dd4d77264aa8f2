//! Rollup Contract capability and its JSON-RPC backed implementation.

use alloy_primitives::{aliases::U40, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, info, warn};
use zkbnb_signer::Interrupted;

use crate::bindings::{CommitBlockInfo, IZkBnb, StoredBlockInfo, VerifyAndExecuteBlockInfo};
use crate::chain::{with_context, CallRequest, ChainClient};
use crate::envelope::{sign_envelope, EnvelopeParams, UnsignedEnvelope};
use crate::error::ContractError;
use crate::options::TransactionOptions;
use crate::request::{DesertExit, DesertNftExit, Operation};

/// Handle to a transaction the node accepted for broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingTransaction {
    pub hash: B256,
}

/// One method per state-changing rollup entry point.
///
/// Implementations sign with the signer bound to `opts` and return once the
/// node accepts the transaction; nothing waits for inclusion.
#[async_trait]
pub trait RollupContract: Send + Sync {
    /// Deployed contract address.
    fn address(&self) -> Address;

    async fn commit_blocks(
        &self,
        opts: TransactionOptions,
        last_block: StoredBlockInfo,
        blocks: Vec<CommitBlockInfo>,
    ) -> Result<PendingTransaction, ContractError>;

    async fn verify_and_execute_blocks(
        &self,
        opts: TransactionOptions,
        blocks: Vec<VerifyAndExecuteBlockInfo>,
        proofs: Vec<U256>,
    ) -> Result<PendingTransaction, ContractError>;

    async fn revert_blocks(
        &self,
        opts: TransactionOptions,
        blocks: Vec<StoredBlockInfo>,
    ) -> Result<PendingTransaction, ContractError>;

    async fn perform_desert(
        &self,
        opts: TransactionOptions,
        exit: DesertExit,
    ) -> Result<PendingTransaction, ContractError>;

    async fn perform_desert_nft(
        &self,
        opts: TransactionOptions,
        exit: DesertNftExit,
    ) -> Result<PendingTransaction, ContractError>;

    async fn withdraw_pending_balance(
        &self,
        opts: TransactionOptions,
        owner: Address,
        token: Address,
        amount: u128,
    ) -> Result<PendingTransaction, ContractError>;

    async fn withdraw_pending_nft_balance(
        &self,
        opts: TransactionOptions,
        nft_index: U40,
    ) -> Result<PendingTransaction, ContractError>;

    async fn cancel_outstanding_deposits_for_desert_mode(
        &self,
        opts: TransactionOptions,
        n: u64,
        deposits_pub_data: Vec<Bytes>,
    ) -> Result<PendingTransaction, ContractError>;

    async fn activate_desert_mode(
        &self,
        opts: TransactionOptions,
    ) -> Result<PendingTransaction, ContractError>;
}

/// Deployed `ZkBNB` instance reached through a [`ChainClient`].
#[derive(Debug, Clone)]
pub struct ZkBnbContract<C> {
    chain: C,
    address: Address,
}

impl<C: ChainClient> ZkBnbContract<C> {
    /// Bind to an already deployed contract. No chain call is made.
    pub fn load(chain: C, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Price, sign and broadcast `input` as a call to the contract.
    async fn transact(
        &self,
        opts: TransactionOptions,
        operation: Operation,
        input: Bytes,
    ) -> Result<PendingTransaction, ContractError> {
        let ctx = opts.context();
        if ctx.is_cancelled() {
            return Err(Interrupted::Cancelled.into());
        }

        let gas_price = match opts.gas_price() {
            Some(price) => price,
            None => with_context(ctx, self.chain.suggest_gas_price()).await?,
        };
        let gas_limit = match opts.gas_limit() {
            0 => {
                let call = CallRequest {
                    from: opts.from(),
                    to: self.address,
                    gas_price: Some(gas_price),
                    data: input.clone(),
                };
                let estimate = with_context(ctx, self.chain.estimate_gas(&call)).await?;
                debug!(target: "rollup::contract", %operation, estimate, "estimated gas limit");
                estimate
            }
            limit => limit,
        };
        let gas_price = u128::try_from(gas_price)
            .map_err(|_| {
                ContractError::Encoding(format!("gas price {gas_price} exceeds 128 bits"))
            })?;

        let unsigned = UnsignedEnvelope::new(
            opts.format(),
            EnvelopeParams {
                chain_id: opts.chain_id_u64(),
                nonce: opts.nonce(),
                gas_price,
                gas_limit,
                to: self.address,
                input,
            },
        );
        let signed = sign_envelope(unsigned, opts.signer().as_ref(), ctx).await?;

        let reported = with_context(ctx, self.chain.broadcast(signed.raw.clone())).await?;
        if reported != signed.hash {
            warn!(
                target: "rollup::contract",
                %operation,
                local = %signed.hash,
                %reported,
                "node reported a different transaction hash"
            );
        }
        info!(
            target: "rollup::contract",
            %operation,
            from = %opts.from(),
            nonce = opts.nonce(),
            gas_price,
            gas_limit,
            tx_hash = %signed.hash,
            "broadcast rollup transaction"
        );
        Ok(PendingTransaction { hash: signed.hash })
    }

    async fn transact_call<T: SolCall + Send>(
        &self,
        opts: TransactionOptions,
        operation: Operation,
        call: T,
    ) -> Result<PendingTransaction, ContractError> {
        self.transact(opts, operation, call.abi_encode().into()).await
    }
}

#[async_trait]
impl<C: ChainClient> RollupContract for ZkBnbContract<C> {
    fn address(&self) -> Address {
        self.address
    }

    async fn commit_blocks(
        &self,
        opts: TransactionOptions,
        last_block: StoredBlockInfo,
        blocks: Vec<CommitBlockInfo>,
    ) -> Result<PendingTransaction, ContractError> {
        let call =
            IZkBnb::commitBlocksCall { lastCommittedBlockData: last_block, newBlocksData: blocks };
        self.transact_call(opts, Operation::CommitBlocks, call).await
    }

    async fn verify_and_execute_blocks(
        &self,
        opts: TransactionOptions,
        blocks: Vec<VerifyAndExecuteBlockInfo>,
        proofs: Vec<U256>,
    ) -> Result<PendingTransaction, ContractError> {
        let call =
            IZkBnb::verifyAndExecuteBlocksCall { verifyAndExecuteBlocksInfo: blocks, proofs };
        self.transact_call(opts, Operation::VerifyAndExecuteBlocks, call).await
    }

    async fn revert_blocks(
        &self,
        opts: TransactionOptions,
        blocks: Vec<StoredBlockInfo>,
    ) -> Result<PendingTransaction, ContractError> {
        let call = IZkBnb::revertBlocksCall { blocksToRevert: blocks };
        self.transact_call(opts, Operation::RevertBlocks, call).await
    }

    async fn perform_desert(
        &self,
        opts: TransactionOptions,
        exit: DesertExit,
    ) -> Result<PendingTransaction, ContractError> {
        let call = IZkBnb::performDesertCall::from(exit);
        self.transact_call(opts, Operation::PerformDesert, call).await
    }

    async fn perform_desert_nft(
        &self,
        opts: TransactionOptions,
        exit: DesertNftExit,
    ) -> Result<PendingTransaction, ContractError> {
        let call = IZkBnb::performDesertNftCall::from(exit);
        self.transact_call(opts, Operation::PerformDesertNft, call).await
    }

    async fn withdraw_pending_balance(
        &self,
        opts: TransactionOptions,
        owner: Address,
        token: Address,
        amount: u128,
    ) -> Result<PendingTransaction, ContractError> {
        let call = IZkBnb::withdrawPendingBalanceCall { owner, token, amount };
        self.transact_call(opts, Operation::WithdrawPendingBalance, call).await
    }

    async fn withdraw_pending_nft_balance(
        &self,
        opts: TransactionOptions,
        nft_index: U40,
    ) -> Result<PendingTransaction, ContractError> {
        let call = IZkBnb::withdrawPendingNFTBalanceCall { nftIndex: nft_index };
        self.transact_call(opts, Operation::WithdrawPendingNftBalance, call).await
    }

    async fn cancel_outstanding_deposits_for_desert_mode(
        &self,
        opts: TransactionOptions,
        n: u64,
        deposits_pub_data: Vec<Bytes>,
    ) -> Result<PendingTransaction, ContractError> {
        let call = IZkBnb::cancelOutstandingDepositsForDesertModeCall {
            n,
            depositsPubData: deposits_pub_data,
        };
        self.transact_call(opts, Operation::CancelOutstandingDeposits, call).await
    }

    async fn activate_desert_mode(
        &self,
        opts: TransactionOptions,
    ) -> Result<PendingTransaction, ContractError> {
        let call = IZkBnb::activateDesertModeCall {};
        self.transact_call(opts, Operation::ActivateDesertMode, call).await
    }
}
