use axum::{
	Json, Router,
	extract::{Path, RawQuery, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use beacon::constants::{BLOCK_REWARDS_ROUTE, HEADER_ROUTE, PRE_ALTAIR_MESSAGE, STATES_ROUTE, SYNC_DUTIES_ROUTE};
use beacon::types::{
	ApiErrorBody, ConsensusReward, HeaderData, HeaderMessage, HeaderResponse, RewardResponse, SignedHeader,
	SyncCommitteeData, SyncCommitteeResponse, SyncDutiesResponse, SyncDuty, ValidatorDetails, ValidatorEntry,
	ValidatorListResponse,
};
use beacon::utils::{epoch_to_first_slot, slot_to_epoch};
use clap::Parser;
use eyre::Result;
use tracing::{debug, info};

const SYNC_COMMITTEE_SIZE: u64 = 512;
const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: u64 = 256;
const VALIDATOR_SET_SIZE: u64 = 1_000_000;

/// Every slot with this remainder is treated as missed
const MISSED_SLOT_MODULUS: u64 = 50;
const MISSED_SLOT_REMAINDER: u64 = 7;

/// Fake beacon node serving deterministic data for local runs of the validator API
#[derive(Debug, Parser)]
#[command(name = "beacon-mock")]
struct Cli {
	#[arg(long, env = "BEACON_HOST", default_value = "127.0.0.1")]
	host: String,

	#[arg(long, env = "BEACON_PORT", default_value_t = 5052)]
	port: u16,

	/// Slot reported as the chain head
	#[arg(long, env = "MOCK_HEAD_SLOT", default_value_t = 9_000_000)]
	head_slot: u64,

	/// First epoch with a sync committee
	#[arg(long, env = "MOCK_ALTAIR_EPOCH", default_value_t = 74_240)]
	altair_epoch: u64,

	#[arg(long, env = "RUST_LOG", default_value = "info")]
	log_level: String,
}

#[derive(Debug, Clone, Copy)]
struct MockChain {
	head_slot: u64,
	altair_slot: u64,
}

impl MockChain {
	fn is_missed(&self, slot: u64) -> bool {
		slot % MISSED_SLOT_MODULUS == MISSED_SLOT_REMAINDER
	}

	/// Resolve `head` or a decimal slot, rejecting slots past the head
	fn resolve_slot(&self, id: &str) -> Result<u64, Response> {
		if id == "head" {
			return Ok(self.head_slot);
		}

		let slot = id.parse::<u64>().map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("Invalid block ID: {id}")))?;
		if slot > self.head_slot {
			return Err(api_error(StatusCode::NOT_FOUND, format!("NOT_FOUND: slot {slot} is ahead of head")));
		}
		Ok(slot)
	}

	fn sync_committee(&self, epoch: u64) -> Vec<u64> {
		let period = epoch / EPOCHS_PER_SYNC_COMMITTEE_PERIOD;
		(0..SYNC_COMMITTEE_SIZE).map(|i| (period * SYNC_COMMITTEE_SIZE + i * 97) % VALIDATOR_SET_SIZE).collect()
	}
}

fn block_root(slot: u64) -> String {
	format!("0x{:064x}", slot)
}

fn slot_from_root(root: &str) -> Option<u64> {
	u64::from_str_radix(root.strip_prefix("0x")?, 16).ok()
}

fn validator_pubkey(index: u64) -> String {
	format!("0x{:096x}", index)
}

fn api_error(status: StatusCode, message: String) -> Response {
	(status, Json(ApiErrorBody { message, code: Some(status.as_u16()) })).into_response()
}

// GET /eth/v1/beacon/headers/{block_id}
async fn get_header_handler(State(chain): State<MockChain>, Path(block_id): Path<String>) -> Response {
	let slot = match chain.resolve_slot(&block_id) {
		Ok(slot) => slot,
		Err(response) => return response,
	};

	if chain.is_missed(slot) {
		return api_error(StatusCode::NOT_FOUND, format!("NOT_FOUND: beacon block at slot {slot}"));
	}

	debug!(slot, "Serving header");

	Json(HeaderResponse {
		execution_optimistic: false,
		finalized: slot + 64 <= chain.head_slot,
		data: HeaderData {
			root: block_root(slot),
			canonical: true,
			header: SignedHeader {
				message: HeaderMessage { slot: slot.to_string(), proposer_index: (slot % VALIDATOR_SET_SIZE).to_string() },
				signature: format!("0x{:0192x}", 0),
			},
		},
	})
	.into_response()
}

// GET /eth/v1/beacon/rewards/blocks/{block_id}
async fn get_block_rewards_handler(State(chain): State<MockChain>, Path(block_id): Path<String>) -> Response {
	let slot = match slot_from_root(&block_id) {
		Some(slot) if slot <= chain.head_slot && !chain.is_missed(slot) => slot,
		_ => return api_error(StatusCode::NOT_FOUND, format!("NOT_FOUND: block {block_id}")),
	};

	let attestations = 20_000_000 + (slot % 1_000) * 1_000;
	let sync_aggregate = 1_500_000;

	Json(RewardResponse {
		execution_optimistic: false,
		finalized: false,
		data: ConsensusReward {
			proposer_index: (slot % VALIDATOR_SET_SIZE).to_string(),
			total: (attestations + sync_aggregate).to_string(),
			attestations: attestations.to_string(),
			sync_aggregate: sync_aggregate.to_string(),
			proposer_slashings: "0".to_string(),
			attester_slashings: "0".to_string(),
		},
	})
	.into_response()
}

// GET /eth/v1/beacon/states/{state_id}/sync_committees
async fn get_sync_committees_handler(State(chain): State<MockChain>, Path(state_id): Path<String>) -> Response {
	let slot = match chain.resolve_slot(&state_id) {
		Ok(slot) => slot,
		Err(response) => return response,
	};

	if slot < chain.altair_slot {
		return api_error(StatusCode::BAD_REQUEST, format!("state at slot {slot} {PRE_ALTAIR_MESSAGE}"));
	}

	let validators: Vec<String> = chain.sync_committee(slot_to_epoch(slot)).iter().map(u64::to_string).collect();
	let validator_aggregates = validators.chunks(128).map(|chunk| chunk.to_vec()).collect();

	Json(SyncCommitteeResponse {
		execution_optimistic: false,
		finalized: false,
		data: SyncCommitteeData { validators, validator_aggregates },
	})
	.into_response()
}

// GET /eth/v1/beacon/states/{state_id}/validators?id=..
async fn get_validators_handler(
	State(chain): State<MockChain>,
	Path(state_id): Path<String>,
	RawQuery(query): RawQuery,
) -> Response {
	if let Err(response) = chain.resolve_slot(&state_id) {
		return response;
	}

	let mut data = Vec::new();
	for pair in query.unwrap_or_default().split('&').filter(|pair| !pair.is_empty()) {
		let Some(id) = pair.strip_prefix("id=") else {
			continue;
		};
		let Ok(index) = id.parse::<u64>() else {
			return api_error(StatusCode::BAD_REQUEST, format!("Invalid validator ID: {id}"));
		};
		// Unknown indices are silently omitted, like a real node
		if index >= VALIDATOR_SET_SIZE {
			continue;
		}
		data.push(ValidatorEntry {
			index: index.to_string(),
			status: "active_ongoing".to_string(),
			validator: ValidatorDetails {
				pubkey: validator_pubkey(index),
				withdrawal_credentials: format!("0x{:064x}", index),
				slashed: false,
			},
		});
	}

	debug!(state_id = %state_id, count = data.len(), "Serving validators");

	Json(ValidatorListResponse { execution_optimistic: false, finalized: false, data }).into_response()
}

// GET /eth/v1/validator/duties/sync/{epoch}
async fn get_sync_duties_handler(State(chain): State<MockChain>, Path(epoch): Path<String>) -> Response {
	let Ok(epoch) = epoch.parse::<u64>() else {
		return api_error(StatusCode::BAD_REQUEST, format!("Invalid epoch: {epoch}"));
	};

	if epoch > slot_to_epoch(chain.head_slot) + 1 || epoch_to_first_slot(epoch) < chain.altair_slot {
		return api_error(StatusCode::NOT_FOUND, format!("NOT_FOUND: sync duties for epoch {epoch}"));
	}

	let data = chain
		.sync_committee(epoch)
		.into_iter()
		.enumerate()
		.map(|(position, index)| SyncDuty {
			pubkey: validator_pubkey(index),
			validator_index: index.to_string(),
			validator_sync_committee_indices: vec![position.to_string()],
		})
		.collect();

	Json(SyncDutiesResponse { execution_optimistic: false, data }).into_response()
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	common::logging::setup_logging(&cli.log_level)?;

	let chain = MockChain { head_slot: cli.head_slot, altair_slot: epoch_to_first_slot(cli.altair_epoch) };
	let bind_addr = format!("{}:{}", cli.host, cli.port);

	info!("Mock Beacon Node Server");
	info!("Listening on: {}", bind_addr);
	info!("Head slot: {}, Altair slot: {}", chain.head_slot, chain.altair_slot);
	info!("Missed slots: slot % {} == {}", MISSED_SLOT_MODULUS, MISSED_SLOT_REMAINDER);

	let app = Router::new()
		.route(format!("/{}/{{block_id}}", HEADER_ROUTE).as_str(), get(get_header_handler))
		.route(format!("/{}/{{block_id}}", BLOCK_REWARDS_ROUTE).as_str(), get(get_block_rewards_handler))
		.route(format!("/{}/{{state_id}}/sync_committees", STATES_ROUTE).as_str(), get(get_sync_committees_handler))
		.route(format!("/{}/{{state_id}}/validators", STATES_ROUTE).as_str(), get(get_validators_handler))
		.route(format!("/{}/{{epoch}}", SYNC_DUTIES_ROUTE).as_str(), get(get_sync_duties_handler))
		.with_state(chain);

	let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
	info!("Mock Beacon Node server ready");

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			if let Err(e) = common::utils::wait_for_signal().await {
				tracing::error!("Signal handler error: {}", e);
			}
		})
		.await?;

	Ok(())
}
