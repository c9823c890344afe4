use eyre::Result;
#[cfg(unix)]
use tokio::{
	select,
	signal::unix::{SignalKind, signal},
};

/// Resolve once SIGINT or SIGTERM is received.
#[cfg(unix)]
pub async fn wait_for_signal() -> Result<()> {
	let mut sigint = signal(SignalKind::interrupt())?;
	let mut sigterm = signal(SignalKind::terminate())?;

	select! {
		_ = sigint.recv() => {}
		_ = sigterm.recv() => {}
	}

	Ok(())
}

#[cfg(windows)]
pub async fn wait_for_signal() -> Result<()> {
	tokio::signal::ctrl_c().await?;
	Ok(())
}

/// Join a base URL and a path without producing a double or missing slash.
pub fn join_url(base_url: &str, path: &str) -> String {
	format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_join_url_variants() {
		assert_eq!(join_url("http://localhost:5052", "eth/v1/node"), "http://localhost:5052/eth/v1/node");
		assert_eq!(join_url("http://localhost:5052/", "eth/v1/node"), "http://localhost:5052/eth/v1/node");
		assert_eq!(join_url("http://localhost:5052", "/eth/v1/node"), "http://localhost:5052/eth/v1/node");
		assert_eq!(join_url("http://localhost:5052//", "//eth/v1/node"), "http://localhost:5052/eth/v1/node");
	}
}
