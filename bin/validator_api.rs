use std::path::PathBuf;
use std::sync::Arc;

use beacon::beacon_client::BeaconApiClient;
use clap::Parser;
use eyre::{Result, WrapErr};
use execution::client::AlloyExecutionClient;
use server::config::ServerConfig;
use server::server::build_validator_api_router;
use server::service::ValidatorApiService;
use services::block_reward::BlockRewardService;
use services::cache::TtlDutyCache;
use services::sync_duties::SyncDutiesService;
use tokio::net::TcpListener;
use tracing::info;

/// REST API answering block reward and sync committee queries for a slot
#[derive(Debug, Parser)]
#[command(name = "validator-api")]
struct Cli {
	/// Path to a TOML config file. `VALIDATOR_API_*` environment variables override it.
	#[arg(long, env = "CONFIG_PATH")]
	config: Option<PathBuf>,

	/// Log filter, e.g. `info` or `validator_api_beacon=debug`
	#[arg(long, env = "RUST_LOG", default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	common::logging::setup_logging(&cli.log_level)?;

	let config = ServerConfig::load(cli.config.as_deref()).wrap_err("Failed to load config")?;
	info!(
		beacon_api_url = %config.beacon_api_url,
		execution_rpc_url = %config.execution_rpc_url,
		duty_cache_enabled = config.duty_cache_enabled,
		"Loaded validator API config"
	);

	let consensus = Arc::new(BeaconApiClient::with_default_client(config.beacon_api_config())?);
	let execution = Arc::new(AlloyExecutionClient::new(&config.execution_rpc_url)?);

	let mut sync_duties = SyncDutiesService::new(Arc::clone(&consensus));
	if config.duty_cache_enabled {
		sync_duties = sync_duties.with_cache(Arc::new(TtlDutyCache::new()), config.duty_cache_ttl());
	}

	let api = ValidatorApiService::new(BlockRewardService::new(consensus, execution), sync_duties);
	let router = build_validator_api_router(api, config.server_timeout());

	let bind_addr = config.bind_addr();
	let listener = TcpListener::bind(&bind_addr).await.wrap_err_with(|| format!("Failed to bind {}", bind_addr))?;
	info!("Starting validator API server on {}", bind_addr);

	axum::serve(listener, router)
		.with_graceful_shutdown(async {
			if let Err(e) = common::utils::wait_for_signal().await {
				tracing::error!("Signal handler error: {}", e);
			}
			info!("Shutdown signal received, draining connections");
		})
		.await
		.wrap_err("Validator API server error")?;

	info!("Validator API server stopped");
	Ok(())
}
