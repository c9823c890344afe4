use async_trait::async_trait;
use eyre::Result;
use services::block_reward::BlockRewardResult;

/// Server side of the validator REST API.
///
/// Errors carrying a `BeaconError` are mapped to client-facing status codes,
/// anything else is answered with a 500.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ValidatorApi: Send + Sync + 'static {
    /// GET /api/v1/blockreward/{slot}
    async fn get_block_reward(&self, slot: u64) -> Result<BlockRewardResult>;

    /// GET /api/v1/syncduties/{slot}
    async fn get_sync_duties(&self, slot: u64) -> Result<Vec<String>>;

    /// GET /health
    async fn health_check(&self) -> Result<()>;
}
