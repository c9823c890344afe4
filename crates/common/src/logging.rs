use eyre::Result;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when it is set; otherwise `default_level` is used as the
/// filter directive (e.g. `info` or `validator_api_beacon=debug,info`).
pub fn setup_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| eyre::eyre!("Invalid log filter '{}': {}", default_level, e))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}
