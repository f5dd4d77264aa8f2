//! Rollup operations and their calldata.

use core::fmt;

use alloy_primitives::{aliases::U40, Address, Bytes, U256};
use alloy_sol_types::SolCall;

use crate::bindings::{
    AccountExitData, AssetExitData, CommitBlockInfo, IZkBnb, NftExitData, StoredBlockInfo,
    VerifyAndExecuteBlockInfo,
};

/// Contract entry point targeted by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CommitBlocks,
    VerifyAndExecuteBlocks,
    RevertBlocks,
    PerformDesert,
    PerformDesertNft,
    WithdrawPendingBalance,
    WithdrawPendingNftBalance,
    CancelOutstandingDeposits,
    ActivateDesertMode,
}

impl Operation {
    pub const ALL: [Self; 9] = [
        Self::CommitBlocks,
        Self::VerifyAndExecuteBlocks,
        Self::RevertBlocks,
        Self::PerformDesert,
        Self::PerformDesertNft,
        Self::WithdrawPendingBalance,
        Self::WithdrawPendingNftBalance,
        Self::CancelOutstandingDeposits,
        Self::ActivateDesertMode,
    ];

    /// Solidity function name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CommitBlocks => "commitBlocks",
            Self::VerifyAndExecuteBlocks => "verifyAndExecuteBlocks",
            Self::RevertBlocks => "revertBlocks",
            Self::PerformDesert => "performDesert",
            Self::PerformDesertNft => "performDesertNft",
            Self::WithdrawPendingBalance => "withdrawPendingBalance",
            Self::WithdrawPendingNftBalance => "withdrawPendingNFTBalance",
            Self::CancelOutstandingDeposits => "cancelOutstandingDepositsForDesertMode",
            Self::ActivateDesertMode => "activateDesertMode",
        }
    }

    /// 4-byte function selector.
    pub const fn selector(&self) -> [u8; 4] {
        match self {
            Self::CommitBlocks => IZkBnb::commitBlocksCall::SELECTOR,
            Self::VerifyAndExecuteBlocks => IZkBnb::verifyAndExecuteBlocksCall::SELECTOR,
            Self::RevertBlocks => IZkBnb::revertBlocksCall::SELECTOR,
            Self::PerformDesert => IZkBnb::performDesertCall::SELECTOR,
            Self::PerformDesertNft => IZkBnb::performDesertNftCall::SELECTOR,
            Self::WithdrawPendingBalance => IZkBnb::withdrawPendingBalanceCall::SELECTOR,
            Self::WithdrawPendingNftBalance => IZkBnb::withdrawPendingNFTBalanceCall::SELECTOR,
            Self::CancelOutstandingDeposits => {
                IZkBnb::cancelOutstandingDepositsForDesertModeCall::SELECTOR
            }
            Self::ActivateDesertMode => IZkBnb::activateDesertModeCall::SELECTOR,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of `performDesert`: exit of one asset balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesertExit {
    pub stored_block: StoredBlockInfo,
    pub nft_root: U256,
    pub asset_exit: AssetExitData,
    pub account_exit: AccountExitData,
    pub asset_merkle_proof: [U256; 16],
    pub account_merkle_proof: [U256; 32],
}

/// Inputs of `performDesertNft`: exit of a batch of NFTs owned by one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesertNftExit {
    pub stored_block: StoredBlockInfo,
    pub asset_root: U256,
    pub account_exit: AccountExitData,
    pub exit_nfts: Vec<NftExitData>,
    pub account_merkle_proof: [U256; 32],
    pub nft_merkle_proofs: Vec<[U256; 40]>,
}

/// One state-changing call against the rollup contract.
///
/// Built by the caller and consumed by a single dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollupOperationRequest {
    CommitBlocks { last_block: StoredBlockInfo, blocks: Vec<CommitBlockInfo> },
    VerifyAndExecuteBlocks { blocks: Vec<VerifyAndExecuteBlockInfo>, proofs: Vec<U256> },
    RevertBlocks { blocks: Vec<StoredBlockInfo> },
    PerformDesert(Box<DesertExit>),
    PerformDesertNft(Box<DesertNftExit>),
    WithdrawPendingBalance { owner: Address, token: Address, amount: u128 },
    WithdrawPendingNftBalance { nft_index: U40 },
    /// Drop the first `n` priority requests; `deposits_pub_data` backs the refunds.
    CancelOutstandingDeposits { n: u64, deposits_pub_data: Vec<Bytes> },
    ActivateDesertMode,
}

impl RollupOperationRequest {
    pub fn operation(&self) -> Operation {
        match self {
            Self::CommitBlocks { .. } => Operation::CommitBlocks,
            Self::VerifyAndExecuteBlocks { .. } => Operation::VerifyAndExecuteBlocks,
            Self::RevertBlocks { .. } => Operation::RevertBlocks,
            Self::PerformDesert(_) => Operation::PerformDesert,
            Self::PerformDesertNft(_) => Operation::PerformDesertNft,
            Self::WithdrawPendingBalance { .. } => Operation::WithdrawPendingBalance,
            Self::WithdrawPendingNftBalance { .. } => Operation::WithdrawPendingNftBalance,
            Self::CancelOutstandingDeposits { .. } => Operation::CancelOutstandingDeposits,
            Self::ActivateDesertMode => Operation::ActivateDesertMode,
        }
    }

    /// ABI-encoded call, selector included. Consumes the request so proof
    /// vectors are moved into the encoder rather than copied.
    pub fn into_calldata(self) -> Bytes {
        let encoded = match self {
            Self::CommitBlocks { last_block, blocks } => IZkBnb::commitBlocksCall {
                lastCommittedBlockData: last_block,
                newBlocksData: blocks,
            }
            .abi_encode(),
            Self::VerifyAndExecuteBlocks { blocks, proofs } => IZkBnb::verifyAndExecuteBlocksCall {
                verifyAndExecuteBlocksInfo: blocks,
                proofs,
            }
            .abi_encode(),
            Self::RevertBlocks { blocks } => {
                IZkBnb::revertBlocksCall { blocksToRevert: blocks }.abi_encode()
            }
            Self::PerformDesert(exit) => IZkBnb::performDesertCall::from(*exit).abi_encode(),
            Self::PerformDesertNft(exit) => IZkBnb::performDesertNftCall::from(*exit).abi_encode(),
            Self::WithdrawPendingBalance { owner, token, amount } => {
                IZkBnb::withdrawPendingBalanceCall { owner, token, amount }.abi_encode()
            }
            Self::WithdrawPendingNftBalance { nft_index } => {
                IZkBnb::withdrawPendingNFTBalanceCall { nftIndex: nft_index }.abi_encode()
            }
            Self::CancelOutstandingDeposits { n, deposits_pub_data } => {
                IZkBnb::cancelOutstandingDepositsForDesertModeCall {
                    n,
                    depositsPubData: deposits_pub_data,
                }
                .abi_encode()
            }
            Self::ActivateDesertMode => IZkBnb::activateDesertModeCall {}.abi_encode(),
        };
        encoded.into()
    }
}

impl From<DesertExit> for IZkBnb::performDesertCall {
    fn from(exit: DesertExit) -> Self {
        let DesertExit {
            stored_block,
            nft_root,
            asset_exit,
            account_exit,
            asset_merkle_proof,
            account_merkle_proof,
        } = exit;
        Self {
            storedBlockInfo: stored_block,
            nftRoot: nft_root,
            assetExitData: asset_exit,
            accountExitData: account_exit,
            assetMerkleProof: asset_merkle_proof,
            accountMerkleProof: account_merkle_proof,
        }
    }
}

impl From<DesertNftExit> for IZkBnb::performDesertNftCall {
    fn from(exit: DesertNftExit) -> Self {
        let DesertNftExit {
            stored_block,
            asset_root,
            account_exit,
            exit_nfts,
            account_merkle_proof,
            nft_merkle_proofs,
        } = exit;
        Self {
            storedBlockInfo: stored_block,
            assetRoot: asset_root,
            accountExitData: account_exit,
            exitNfts: exit_nfts,
            accountMerkleProof: account_merkle_proof,
            nftMerkleProofs: nft_merkle_proofs,
        }
    }
}
