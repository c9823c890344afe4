use alloy::{
    eips::BlockNumberOrTag,
    network::Ethereum,
    providers::{DynProvider, Provider, ProviderBuilder},
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tracing::debug;

use crate::types::ExecutionBlock;

/// Execution-layer access needed to classify a block.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Fetch the block at `height`. A height the node does not know is an error.
    async fn get_block_by_height(&self, height: u64) -> Result<ExecutionBlock>;
}

/// JSON-RPC execution client backed by an alloy provider
#[derive(Clone)]
pub struct AlloyExecutionClient {
    provider: DynProvider<Ethereum>,
}

impl std::fmt::Debug for AlloyExecutionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyExecutionClient").finish_non_exhaustive()
    }
}

impl AlloyExecutionClient {
    /// Connect over HTTP to the execution node at `rpc_url`.
    ///
    /// No request is made here; an unreachable node surfaces on first use.
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = Url::parse(rpc_url)
            .wrap_err_with(|| format!("Failed to parse execution client URL: {}", rpc_url))?;

        let provider = ProviderBuilder::new()
            .network::<Ethereum>()
            .connect_http(url)
            .erased();

        Ok(Self { provider })
    }
}

#[async_trait]
impl ExecutionClient for AlloyExecutionClient {
    async fn get_block_by_height(&self, height: u64) -> Result<ExecutionBlock> {
        debug!(height, "Fetching execution block");

        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(height))
            .await
            .wrap_err_with(|| format!("Failed to fetch execution block {}", height))?
            .ok_or_else(|| eyre::eyre!("Execution block {} not found", height))?;

        let header = block.header.inner;

        Ok(ExecutionBlock {
            number: header.number,
            coinbase: header.beneficiary,
            extra_data: header.extra_data,
        })
    }
}
