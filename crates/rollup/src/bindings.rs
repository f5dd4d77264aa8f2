//! `ZkBNB` rollup contract ABI.
//!
//! Only the entry points the committer and desert-mode exit tooling call are
//! declared. Struct layouts mirror the deployed `Storage`, `ZkBNB` and
//! `DesertVerifier` definitions.

use alloy_sol_types::sol;

sol! {
    /// Header of a block already stored on L1.
    #[derive(Debug, PartialEq, Eq)]
    struct StoredBlockInfo {
        uint16 blockSize;
        uint32 blockNumber;
        uint64 priorityOperations;
        bytes32 pendingOnchainOperationsHash;
        uint256 timestamp;
        bytes32 stateRoot;
        bytes32 commitment;
    }

    /// Data of a block being committed.
    #[derive(Debug, PartialEq, Eq)]
    struct CommitBlockInfo {
        bytes32 newStateRoot;
        bytes publicData;
        uint256 timestamp;
        uint32[] publicDataOffsets;
        uint32 blockNumber;
        uint16 blockSize;
    }

    /// Committed block plus the pubdata of its on-chain operations.
    #[derive(Debug, PartialEq, Eq)]
    struct VerifyAndExecuteBlockInfo {
        StoredBlockInfo blockHeader;
        bytes[] pendingOnchainOpsPubData;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct AssetExitData {
        uint16 assetId;
        uint128 amount;
        uint128 offerCanceledOrFinalized;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct AccountExitData {
        uint32 accountId;
        bytes20 l1Address;
        uint256 pubKeyX;
        uint256 pubKeyY;
        uint32 nonce;
        uint256 collectionNonce;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct NftExitData {
        uint40 nftIndex;
        uint32 ownerAccountIndex;
        uint32 creatorAccountIndex;
        uint16 creatorTreasuryRate;
        uint16 collectionId;
        uint256 nftContentHash;
        uint8 nftContentType;
    }

    /// State-changing entry points of the rollup contract.
    interface IZkBnb {
        function commitBlocks(
            StoredBlockInfo lastCommittedBlockData,
            CommitBlockInfo[] newBlocksData
        ) external;

        function verifyAndExecuteBlocks(
            VerifyAndExecuteBlockInfo[] verifyAndExecuteBlocksInfo,
            uint256[] proofs
        ) external;

        function revertBlocks(StoredBlockInfo[] blocksToRevert) external;

        function performDesert(
            StoredBlockInfo storedBlockInfo,
            uint256 nftRoot,
            AssetExitData assetExitData,
            AccountExitData accountExitData,
            uint256[16] assetMerkleProof,
            uint256[32] accountMerkleProof
        ) external;

        function performDesertNft(
            StoredBlockInfo storedBlockInfo,
            uint256 assetRoot,
            AccountExitData accountExitData,
            NftExitData[] exitNfts,
            uint256[32] accountMerkleProof,
            uint256[40][] nftMerkleProofs
        ) external;

        function withdrawPendingBalance(address owner, address token, uint128 amount) external;

        function withdrawPendingNFTBalance(uint40 nftIndex) external;

        function cancelOutstandingDepositsForDesertMode(uint64 n, bytes[] depositsPubData) external;

        function activateDesertMode() external;
    }
}
