use std::fmt;
use std::sync::Arc;

use beacon::beacon_client::ConsensusClient;
use beacon::error::BeaconError;
use beacon::utils::is_slot_in_future;
use eyre::{Report, Result, WrapErr};
use execution::client::ExecutionClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::MEV_RELAY_SIGNATURES;

/// How a block was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Vanilla,
    Mev,
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStatus::Vanilla => write!(f, "vanilla"),
            BlockStatus::Mev => write!(f, "mev"),
        }
    }
}

/// Proposer reward for a slot. `reward` is the consensus total in Gwei, as
/// the beacon node reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRewardResult {
    pub status: BlockStatus,
    pub reward: String,
}

/// Classify normalized extra data by searching for known relay and builder tags.
pub fn classify_extra_data(normalized: &str) -> BlockStatus {
    if MEV_RELAY_SIGNATURES.iter().any(|tag| normalized.contains(tag)) {
        BlockStatus::Mev
    } else {
        BlockStatus::Vanilla
    }
}

/// Combines the beacon node's reward breakdown with the execution block's
/// extra data to answer reward queries for a single slot.
pub struct BlockRewardService<C: ConsensusClient, E: ExecutionClient> {
    consensus: Arc<C>,
    execution: Arc<E>,
}

impl<C: ConsensusClient, E: ExecutionClient> Clone for BlockRewardService<C, E> {
    fn clone(&self) -> Self {
        Self { consensus: self.consensus.clone(), execution: self.execution.clone() }
    }
}

impl<C: ConsensusClient, E: ExecutionClient> BlockRewardService<C, E> {
    pub fn new(consensus: Arc<C>, execution: Arc<E>) -> Self {
        Self { consensus, execution }
    }

    pub async fn get_block_reward(&self, slot: u64) -> Result<BlockRewardResult> {
        let current_slot = self.consensus.get_current_slot().await.wrap_err("Failed to fetch current slot")?;
        if is_slot_in_future(slot, current_slot) {
            return Err(Report::new(BeaconError::SlotInFuture)
                .wrap_err(format!("Requested slot {} is ahead of head slot {}", slot, current_slot)));
        }

        let header = self
            .consensus
            .get_beacon_header(slot)
            .await
            .wrap_err_with(|| format!("Failed to fetch beacon header for slot {}", slot))?;

        let reward = self
            .consensus
            .get_consensus_reward(&header.block_root)
            .await
            .wrap_err_with(|| format!("Failed to fetch consensus reward for block {}", header.block_root))?;

        // The execution block at the slot height only decides the status;
        // the amount always comes from the consensus layer.
        let block = self
            .execution
            .get_block_by_height(slot)
            .await
            .wrap_err_with(|| format!("Failed to fetch execution block {}", slot))?;

        let extra_data = block.normalized_extra_data();
        let status = classify_extra_data(&extra_data);
        debug!(
            slot,
            block_number = block.number,
            coinbase = %block.coinbase,
            extra_data = %extra_data,
            %status,
            "Classified block"
        );

        info!(slot, %status, reward = %reward.total, proposer_index = %reward.proposer_index, "Resolved block reward");

        Ok(BlockRewardResult { status, reward: reward.total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes};
    use beacon::beacon_client::MockConsensusClient;
    use beacon::error::find_beacon_error;
    use beacon::types::{BeaconHeader, ConsensusReward};
    use execution::client::MockExecutionClient;
    use execution::types::ExecutionBlock;

    const BLOCK_ROOT: &str = "0xcf8e0d4e9587369b2301d0790347320302cc0943d5a1884560367e8208d920f2";

    fn header(slot: u64) -> BeaconHeader {
        BeaconHeader { block_root: BLOCK_ROOT.to_string(), proposer_index: "42".to_string(), slot }
    }

    fn reward(total: &str) -> ConsensusReward {
        ConsensusReward {
            proposer_index: "42".to_string(),
            total: total.to_string(),
            attestations: "0".to_string(),
            sync_aggregate: "0".to_string(),
            proposer_slashings: "0".to_string(),
            attester_slashings: "0".to_string(),
        }
    }

    fn block(slot: u64, extra: &[u8]) -> ExecutionBlock {
        ExecutionBlock { number: slot, coinbase: Address::ZERO, extra_data: Bytes::copy_from_slice(extra) }
    }

    fn consensus_for(slot: u64, head: u64, total: &'static str) -> MockConsensusClient {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().times(1).returning(move || Ok(head));
        consensus.expect_get_beacon_header().withf(move |s| *s == slot).times(1).returning(|s| Ok(header(s)));
        consensus
            .expect_get_consensus_reward()
            .withf(|root| root == BLOCK_ROOT)
            .times(1)
            .returning(move |_| Ok(reward(total)));
        consensus
    }

    fn execution_with(extra: &'static [u8]) -> MockExecutionClient {
        let mut execution = MockExecutionClient::new();
        execution.expect_get_block_by_height().times(1).returning(move |h| Ok(block(h, extra)));
        execution
    }

    #[test]
    fn test_classify_extra_data() {
        assert_eq!(classify_extra_data("flashbots"), BlockStatus::Mev);
        assert_eq!(classify_extra_data("built by beaverbuild.org"), BlockStatus::Mev);
        assert_eq!(classify_extra_data("rsync-builder.xyz"), BlockStatus::Mev);
        assert_eq!(classify_extra_data("geth"), BlockStatus::Vanilla);
        assert_eq!(classify_extra_data(""), BlockStatus::Vanilla);
    }

    #[test]
    fn test_block_status_serialization() {
        let result = BlockRewardResult { status: BlockStatus::Mev, reward: "123".to_string() };
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"status":"mev","reward":"123"}"#);
        assert_eq!(BlockStatus::Vanilla.to_string(), "vanilla");
    }

    #[tokio::test]
    async fn test_mev_block() {
        let service = BlockRewardService::new(
            Arc::new(consensus_for(100, 100, "35183286")),
            Arc::new(execution_with(b"  Flashbots ")),
        );

        let result = service.get_block_reward(100).await.unwrap();
        assert_eq!(result, BlockRewardResult { status: BlockStatus::Mev, reward: "35183286".to_string() });
    }

    #[tokio::test]
    async fn test_vanilla_block() {
        let service =
            BlockRewardService::new(Arc::new(consensus_for(90, 100, "1000")), Arc::new(execution_with(b"geth")));

        let result = service.get_block_reward(90).await.unwrap();
        assert_eq!(result.status, BlockStatus::Vanilla);
        assert_eq!(result.reward, "1000");
    }

    #[tokio::test]
    async fn test_next_slot_is_allowed() {
        let service =
            BlockRewardService::new(Arc::new(consensus_for(101, 100, "7")), Arc::new(execution_with(b"nethermind")));

        assert!(service.get_block_reward(101).await.is_ok());
    }

    #[tokio::test]
    async fn test_future_slot_makes_no_further_calls() {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().times(1).returning(|| Ok(100));
        consensus.expect_get_beacon_header().never();
        consensus.expect_get_consensus_reward().never();
        let mut execution = MockExecutionClient::new();
        execution.expect_get_block_by_height().never();

        let service = BlockRewardService::new(Arc::new(consensus), Arc::new(execution));
        let err = service.get_block_reward(102).await.unwrap_err();

        assert_eq!(find_beacon_error(&err), Some(&BeaconError::SlotInFuture));
    }

    #[tokio::test]
    async fn test_missed_slot_propagates() {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().returning(|| Ok(100));
        consensus
            .expect_get_beacon_header()
            .times(1)
            .returning(|_| Err(Report::new(BeaconError::SlotMissedOrDoesNotExist).wrap_err("header 404")));
        consensus.expect_get_consensus_reward().never();
        let mut execution = MockExecutionClient::new();
        execution.expect_get_block_by_height().never();

        let service = BlockRewardService::new(Arc::new(consensus), Arc::new(execution));
        let err = service.get_block_reward(50).await.unwrap_err();

        assert_eq!(find_beacon_error(&err), Some(&BeaconError::SlotMissedOrDoesNotExist));
        assert!(format!("{:#}", err).contains("Failed to fetch beacon header for slot 50"));
    }

    #[tokio::test]
    async fn test_head_failure_propagates() {
        let mut consensus = MockConsensusClient::new();
        consensus
            .expect_get_current_slot()
            .returning(|| Err(Report::new(BeaconError::UnexpectedStatus(503))));
        consensus.expect_get_beacon_header().never();

        let service = BlockRewardService::new(Arc::new(consensus), Arc::new(MockExecutionClient::new()));
        let err = service.get_block_reward(50).await.unwrap_err();

        assert_eq!(find_beacon_error(&err), Some(&BeaconError::UnexpectedStatus(503)));
    }

    #[tokio::test]
    async fn test_execution_failure_has_no_domain_kind() {
        let mut execution = MockExecutionClient::new();
        execution
            .expect_get_block_by_height()
            .times(1)
            .returning(|h| Err(eyre::eyre!("Block {} not found", h)));

        let service = BlockRewardService::new(Arc::new(consensus_for(100, 100, "1")), Arc::new(execution));
        let err = service.get_block_reward(100).await.unwrap_err();

        assert_eq!(find_beacon_error(&err), None);
        assert!(format!("{:#}", err).contains("Failed to fetch execution block 100"));
    }
}
