//! Beacon API client for the slot queries behind block rewards and sync duties

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use common::utils::join_url;

use crate::constants::{
	BLOCK_REWARDS_ROUTE, HEAD_HEADER_ROUTE, HEADER_ROUTE, PRE_ALTAIR_MESSAGE, STATES_ROUTE, SYNC_DUTIES_ROUTE,
};
use crate::error::BeaconError;
use crate::metrics::beacon_client_metrics;
use crate::types::{
	ApiErrorBody, BeaconApiConfig, BeaconHeader, ConsensusReward, HeaderResponse, RewardResponse,
	SyncCommitteeResponse, SyncDutiesResponse, ValidatorListResponse, parse_pubkey,
};
use crate::utils::{chunk_validator_ids, validator_ids_query};

/// HTTP response containing status code and body
#[derive(Debug, Clone)]
pub struct HttpResponse {
	pub status: u16,
	pub body: Vec<u8>,
}

impl HttpResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Trait for making HTTP requests (mockable for testing)
/// When test-utils feature is enabled, mockall will generate MockHttpClient
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
	/// Perform an HTTP GET request to the given URL
	async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Production HTTP client implementation using reqwest
pub struct ReqwestClient {
	client: Client,
}

impl ReqwestClient {
	/// Create a new ReqwestClient with the given timeout
	pub fn new(timeout_secs: u64) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_secs(timeout_secs))
			.build()
			.wrap_err("Failed to create HTTP client")?;
		Ok(Self { client })
	}
}

#[async_trait]
impl HttpClient for ReqwestClient {
	async fn get(&self, url: &str) -> Result<HttpResponse> {
		let response = self
			.client
			.get(url)
			.header("Accept", "application/json")
			.send()
			.await
			.wrap_err_with(|| format!("Failed to send request to {}", url))?;

		let status = response.status().as_u16();
		let body =
			response.bytes().await.wrap_err_with(|| format!("Failed to read response body from {}", url))?.to_vec();

		Ok(HttpResponse { status, body })
	}
}

/// Consensus-layer queries the services are built on.
///
/// Every method returns an `eyre::Report` whose chain carries a
/// [`BeaconError`] describing how the upstream call failed.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ConsensusClient: Send + Sync {
	/// Slot of the canonical head header.
	async fn get_current_slot(&self) -> Result<u64>;

	/// Header of the block at exactly `slot`. A missing block yields
	/// [`BeaconError::SlotMissedOrDoesNotExist`].
	async fn get_beacon_header(&self, slot: u64) -> Result<BeaconHeader>;

	/// Proposer reward breakdown for the block identified by `block_root`.
	async fn get_consensus_reward(&self, block_root: &str) -> Result<ConsensusReward>;

	/// Validator indices of the sync committee at the state of `slot`.
	async fn get_sync_committee_indexes(&self, slot: u64) -> Result<Vec<String>>;

	/// Pubkeys of the validators with sync duties in `epoch`.
	async fn get_sync_duties(&self, epoch: u64) -> Result<Vec<String>>;

	/// Resolve validator indices to pubkeys at the state of `slot`. Either all
	/// pubkeys are returned or the call fails as a whole.
	async fn resolve_validator_pubkeys(&self, slot: u64, indexes: &[String]) -> Result<Vec<String>>;
}

/// Beacon API client backed by a single beacon node
pub struct BeaconApiClient<H: HttpClient> {
	http_client: Arc<H>,
	config: BeaconApiConfig,
}

// Manual Debug implementation since H might not implement Debug
impl<H: HttpClient> std::fmt::Debug for BeaconApiClient<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BeaconApiClient").field("config", &self.config).finish()
	}
}

// Manual Clone implementation since H might not implement Clone
impl<H: HttpClient> Clone for BeaconApiClient<H> {
	fn clone(&self) -> Self {
		Self { http_client: Arc::clone(&self.http_client), config: self.config.clone() }
	}
}

impl<H: HttpClient> BeaconApiClient<H> {
	/// Creates a new BeaconApiClient configured with the provided BeaconApiConfig and HTTP client.
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - The endpoint is empty
	/// - The request timeout is zero (would cause immediate timeouts)
	/// - The concurrency ceiling is zero (no chunk request could ever run)
	pub fn new(config: BeaconApiConfig, http_client: H) -> Result<Self> {
		if config.endpoint.trim().is_empty() {
			eyre::bail!("Beacon endpoint must not be empty");
		}

		if config.request_timeout_secs == 0 {
			eyre::bail!("Request timeout must be greater than zero");
		}

		if config.max_concurrent_requests == 0 {
			eyre::bail!("Max concurrent requests must be greater than zero");
		}

		Ok(Self { http_client: Arc::new(http_client), config })
	}

	/// Perform a GET against `path` on the configured beacon node.
	///
	/// Connection level failures are tagged [`BeaconError::Transport`]; the
	/// status code is left for the caller to classify. `route` is the
	/// low-cardinality metrics label for the request.
	async fn send(&self, route: &'static str, path: &str) -> Result<HttpResponse> {
		const METHOD: &str = "GET";

		let url = join_url(&self.config.endpoint, path);
		debug!(url = %url, "Making beacon API request");

		let metrics = beacon_client_metrics();
		let start = metrics.start(route, METHOD);

		match self.http_client.get(&url).await {
			Ok(response) => {
				metrics.finish_status(route, METHOD, response.status, start);
				Ok(response)
			}
			Err(e) => {
				metrics.finish_label(route, METHOD, "error", start);
				Err(e.wrap_err(BeaconError::Transport))
			}
		}
	}

	async fn fetch_validator_chunk(&self, slot: u64, position: usize, ids: &[String]) -> Result<Vec<String>> {
		let path = format!("{}/{}/validators?{}", STATES_ROUTE, slot, validator_ids_query(ids));

		let response = self.send("/eth/v1/beacon/states/{state_id}/validators", &path).await?;
		if !response.is_success() {
			return Err(unexpected_status(&response))
				.wrap_err_with(|| format!("Failed to fetch validator chunk {} at slot {}", position, slot));
		}

		let parsed: ValidatorListResponse = decode(&response)
			.wrap_err_with(|| format!("Failed to parse validator chunk {} at slot {}", position, slot))?;

		let mut pubkeys = Vec::with_capacity(parsed.data.len());
		for entry in parsed.data {
			parse_pubkey(&entry.validator.pubkey)
				.map_err(|e| e.wrap_err(BeaconError::Parse))
				.wrap_err_with(|| format!("Invalid pubkey for validator {}", entry.index))?;
			pubkeys.push(entry.validator.pubkey);
		}

		debug!(slot, chunk = position, requested = ids.len(), resolved = pubkeys.len(), "Resolved validator chunk");

		Ok(pubkeys)
	}
}

#[async_trait]
impl<H: HttpClient> ConsensusClient for BeaconApiClient<H> {
	async fn get_current_slot(&self) -> Result<u64> {
		let response =
			self.send("/eth/v1/beacon/headers/head", HEAD_HEADER_ROUTE).await.wrap_err("Failed to fetch head header")?;

		if !response.is_success() {
			return Err(unexpected_status(&response)).wrap_err("Failed to fetch head header");
		}

		let parsed: HeaderResponse = decode(&response).wrap_err("Failed to parse head header")?;
		parsed
			.data
			.header
			.message
			.parse_slot()
			.map_err(|e| e.wrap_err(BeaconError::Parse))
			.wrap_err("Failed to parse head slot")
	}

	async fn get_beacon_header(&self, slot: u64) -> Result<BeaconHeader> {
		let path = format!("{}/{}", HEADER_ROUTE, slot);
		let response = self
			.send("/eth/v1/beacon/headers/{block_id}", &path)
			.await
			.wrap_err_with(|| format!("Failed to fetch beacon header for slot {}", slot))?;

		if !response.is_success() {
			return Err(block_lookup_error(&response))
				.wrap_err_with(|| format!("Failed to fetch beacon header for slot {}", slot));
		}

		let parsed: HeaderResponse =
			decode(&response).wrap_err_with(|| format!("Failed to parse beacon header for slot {}", slot))?;

		parsed
			.into_header()
			.map_err(|e| e.wrap_err(BeaconError::Parse))
			.wrap_err_with(|| format!("Failed to parse beacon header for slot {}", slot))
	}

	async fn get_consensus_reward(&self, block_root: &str) -> Result<ConsensusReward> {
		let path = format!("{}/{}", BLOCK_REWARDS_ROUTE, block_root);
		let response = self
			.send("/eth/v1/beacon/rewards/blocks/{block_id}", &path)
			.await
			.wrap_err_with(|| format!("Failed to fetch block reward for {}", block_root))?;

		if !response.is_success() {
			return Err(block_lookup_error(&response))
				.wrap_err_with(|| format!("Failed to fetch block reward for {}", block_root));
		}

		let parsed: RewardResponse =
			decode(&response).wrap_err_with(|| format!("Failed to parse block reward for {}", block_root))?;

		parsed
			.data
			.total_gwei()
			.map_err(|e| e.wrap_err(BeaconError::Parse))
			.wrap_err_with(|| format!("Failed to parse block reward for {}", block_root))?;

		Ok(parsed.data)
	}

	async fn get_sync_committee_indexes(&self, slot: u64) -> Result<Vec<String>> {
		let path = format!("{}/{}/sync_committees", STATES_ROUTE, slot);
		let response = self
			.send("/eth/v1/beacon/states/{state_id}/sync_committees", &path)
			.await
			.wrap_err_with(|| format!("Failed to fetch sync committee for slot {}", slot))?;

		if !response.is_success() {
			return Err(sync_committee_error(&response))
				.wrap_err_with(|| format!("Failed to fetch sync committee for slot {}", slot));
		}

		let parsed: SyncCommitteeResponse =
			decode(&response).wrap_err_with(|| format!("Failed to parse sync committee for slot {}", slot))?;

		Ok(parsed.data.validators)
	}

	async fn get_sync_duties(&self, epoch: u64) -> Result<Vec<String>> {
		let path = format!("{}/{}", SYNC_DUTIES_ROUTE, epoch);
		let response = self
			.send("/eth/v1/validator/duties/sync/{epoch}", &path)
			.await
			.wrap_err_with(|| format!("Failed to fetch sync duties for epoch {}", epoch))?;

		if !response.is_success() {
			let error = if response.status == 404 {
				upstream_error(BeaconError::DutiesNotFound, &response)
			} else {
				unexpected_status(&response)
			};
			return Err(error).wrap_err_with(|| format!("Failed to fetch sync duties for epoch {}", epoch));
		}

		let parsed: SyncDutiesResponse =
			decode(&response).wrap_err_with(|| format!("Failed to parse sync duties for epoch {}", epoch))?;

		Ok(parsed.data.into_iter().map(|duty| duty.pubkey).collect())
	}

	/// Fans out one request per chunk of at most 100 ids, keeping no more than
	/// `max_concurrent_requests` in flight.
	///
	/// Results are joined in chunk order. The first failing chunk ends the
	/// stream, which drops (and so cancels) every other in-flight request.
	async fn resolve_validator_pubkeys(&self, slot: u64, indexes: &[String]) -> Result<Vec<String>> {
		if indexes.is_empty() {
			return Ok(Vec::new());
		}

		let chunks = chunk_validator_ids(indexes);
		debug!(slot, validators = indexes.len(), chunks = chunks.len(), "Resolving validator pubkeys");

		let requests: Vec<_> = chunks
			.into_iter()
			.enumerate()
			.map(|(position, ids)| self.fetch_validator_chunk(slot, position, ids))
			.collect();

		let resolved: Vec<Vec<String>> = stream::iter(requests)
			.buffered(self.config.max_concurrent_requests)
			.try_collect()
			.await
			.wrap_err_with(|| format!("Failed to resolve validator pubkeys at slot {}", slot))?;

		Ok(resolved.into_iter().flatten().collect())
	}
}

// Convenience constructor for production use with ReqwestClient
impl BeaconApiClient<ReqwestClient> {
	/// Creates a new BeaconApiClient with the default ReqwestClient HTTP client.
	///
	/// This is the standard constructor for production use. For testing, use
	/// `BeaconApiClient::new()` with a mock HTTP client.
	pub fn with_default_client(config: BeaconApiConfig) -> Result<Self> {
		let http_client = ReqwestClient::new(config.request_timeout_secs)?;
		Self::new(config, http_client)
	}
}

/// Deserialize a successful response body, tagging failures [`BeaconError::Parse`].
fn decode<T>(response: &HttpResponse) -> Result<T>
where
	T: for<'de> Deserialize<'de>,
{
	serde_json::from_slice(&response.body).map_err(|e| eyre::Report::new(e).wrap_err(BeaconError::Parse))
}

/// Tag `kind` with the upstream message, if the node sent one.
fn upstream_error(kind: BeaconError, response: &HttpResponse) -> eyre::Report {
	let body = ApiErrorBody::from_body(&response.body);
	let report = eyre::Report::new(kind);
	if body.message.is_empty() { report } else { report.wrap_err(body.message) }
}

fn unexpected_status(response: &HttpResponse) -> eyre::Report {
	upstream_error(BeaconError::UnexpectedStatus(response.status), response)
}

/// Classify a failed header or reward lookup.
fn block_lookup_error(response: &HttpResponse) -> eyre::Report {
	match response.status {
		404 => upstream_error(BeaconError::SlotMissedOrDoesNotExist, response),
		_ => unexpected_status(response),
	}
}

/// Classify a failed sync committee lookup.
///
/// Nodes have no structured code for a pre-Altair state, so the message text
/// is the only signal.
fn sync_committee_error(response: &HttpResponse) -> eyre::Report {
	let body = ApiErrorBody::from_body(&response.body);
	match response.status {
		404 => upstream_error(BeaconError::DutiesNotFound, response),
		400 if body.message.contains(PRE_ALTAIR_MESSAGE) => upstream_error(BeaconError::SlotWasMissed, response),
		_ => unexpected_status(response),
	}
}
