use async_trait::async_trait;
use beacon::beacon_client::ConsensusClient;
use eyre::Result;
use execution::client::ExecutionClient;
use services::block_reward::{BlockRewardResult, BlockRewardService};
use services::sync_duties::SyncDutiesService;

use crate::api::ValidatorApi;

/// [`ValidatorApi`] backed by the block reward and sync duties services.
pub struct ValidatorApiService<C: ConsensusClient, E: ExecutionClient> {
    block_rewards: BlockRewardService<C, E>,
    sync_duties: SyncDutiesService<C>,
}

impl<C: ConsensusClient, E: ExecutionClient> ValidatorApiService<C, E> {
    pub fn new(block_rewards: BlockRewardService<C, E>, sync_duties: SyncDutiesService<C>) -> Self {
        Self { block_rewards, sync_duties }
    }
}

#[async_trait]
impl<C, E> ValidatorApi for ValidatorApiService<C, E>
where
    C: ConsensusClient + 'static,
    E: ExecutionClient + 'static,
{
    async fn get_block_reward(&self, slot: u64) -> Result<BlockRewardResult> {
        self.block_rewards.get_block_reward(slot).await
    }

    async fn get_sync_duties(&self, slot: u64) -> Result<Vec<String>> {
        self.sync_duties.get_sync_duties(slot).await
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
