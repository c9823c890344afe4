use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use beacon::types::BeaconApiConfig;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

/// Environment variables with this prefix override file values,
/// e.g. `VALIDATOR_API_BEACON_API_URL`.
pub const ENV_PREFIX: &str = "VALIDATOR_API";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Beacon node root URL
    pub beacon_api_url: String,

    /// Execution node JSON-RPC URL
    pub execution_rpc_url: String,

    /// Timeout for every upstream beacon request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Ceiling on validator chunk requests in flight for one lookup
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    #[serde(default = "default_duty_cache_enabled")]
    pub duty_cache_enabled: bool,

    #[serde(default = "default_duty_cache_ttl_secs")]
    pub duty_cache_ttl_secs: u64,

    /// Deadline for a whole inbound request, upstream calls included
    #[serde(default = "default_server_timeout_secs")]
    pub server_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    beacon::constants::DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_duty_cache_enabled() -> bool {
    true
}

fn default_duty_cache_ttl_secs() -> u64 {
    services::constants::DUTY_CACHE_TTL.as_secs()
}

fn default_server_timeout_secs() -> u64 {
    60
}

impl ServerConfig {
    /// Load from an optional TOML file, then apply `VALIDATOR_API_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let config: ServerConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .wrap_err("Failed to read configuration")?
            .try_deserialize()
            .wrap_err("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.beacon_api_url.trim().is_empty() {
            eyre::bail!("beacon_api_url must be set");
        }
        if self.execution_rpc_url.trim().is_empty() {
            eyre::bail!("execution_rpc_url must be set");
        }
        if self.request_timeout_secs == 0 {
            eyre::bail!("request_timeout_secs must be greater than 0");
        }
        if self.max_concurrent_requests == 0 {
            eyre::bail!("max_concurrent_requests must be greater than 0");
        }
        if self.server_timeout_secs == 0 {
            eyre::bail!("server_timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn beacon_api_config(&self) -> BeaconApiConfig {
        BeaconApiConfig {
            endpoint: self.beacon_api_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
            max_concurrent_requests: self.max_concurrent_requests,
        }
    }

    pub fn duty_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.duty_cache_ttl_secs)
    }

    pub fn server_timeout(&self) -> Duration {
        Duration::from_secs(self.server_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_applies_defaults() {
        let file = write_config(
            r#"
            beacon_api_url = "http://localhost:5052"
            execution_rpc_url = "http://localhost:8545"
            "#,
        );

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_concurrent_requests, 16);
        assert!(config.duty_cache_enabled);
        assert_eq!(config.duty_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.server_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_overrides() {
        let file = write_config(
            r#"
            host = "127.0.0.1"
            port = 9000
            beacon_api_url = "http://beacon:5052"
            execution_rpc_url = "http://geth:8545"
            request_timeout_secs = 5
            max_concurrent_requests = 4
            duty_cache_enabled = false
            "#,
        );

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert!(!config.duty_cache_enabled);

        let beacon = config.beacon_api_config();
        assert_eq!(beacon.endpoint, "http://beacon:5052");
        assert_eq!(beacon.request_timeout_secs, 5);
        assert_eq!(beacon.max_concurrent_requests, 4);
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let file = write_config(
            r#"
            beacon_api_url = "http://localhost:5052"
            execution_rpc_url = "http://localhost:8545"
            request_timeout_secs = 0
            "#,
        );

        let err = ServerConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("request_timeout_secs"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ServerConfig::load(Some(Path::new("/nonexistent/validator-api.toml"))).is_err());
    }

    #[test]
    fn test_validate_empty_urls() {
        let mut config: ServerConfig = toml::from_str(
            r#"
            beacon_api_url = ""
            execution_rpc_url = "http://localhost:8545"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        config.beacon_api_url = "http://localhost:5052".to_string();
        assert!(config.validate().is_ok());

        config.max_concurrent_requests = 0;
        assert!(config.validate().is_err());
    }
}
