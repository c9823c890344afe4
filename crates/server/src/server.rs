use std::sync::Arc;
use std::time::Duration;

use axum::{
	Json, Router,
	extract::{Path, State},
	http::{StatusCode, header},
	response::{IntoResponse, Response},
	routing::get,
};
use beacon::error::{BeaconError, find_beacon_error};
use beacon::metrics::BEACON_CLIENT_REGISTRY;
use common::metrics::encode_registries;
use eyre::Report;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error};

use crate::api::ValidatorApi;
use crate::metrics::{SERVER_METRICS_REGISTRY, server_http_metrics};
use crate::routes;
use crate::types::{ApiError, BlockRewardResponse, SyncDutiesResponse};

const BLOCK_REWARD_FAILURE: &str = "Failed to retrieve block reward";
const SYNC_DUTIES_FAILURE: &str = "Failed to retrieve sync duties";

/// Build an Axum router for the validator REST API,
/// using any implementation of `ValidatorApi`.
///
/// Requests still running after `request_timeout` are dropped, which cancels
/// their upstream calls.
pub fn build_validator_api_router<A>(api: A, request_timeout: Duration) -> Router
where
	A: ValidatorApi,
{
	let state = Arc::new(api);

	Router::new()
		.route(routes::HEALTH, get(health::<A>))
		.route(routes::METRICS, get(get_metrics))
		.route(routes::BLOCK_REWARD, get(get_block_reward::<A>))
		.route(routes::SYNC_DUTIES, get(get_sync_duties::<A>))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(TimeoutLayer::new(request_timeout))
}

/// Translate a service error into the client-facing status and body.
pub fn api_error_from_report(err: &Report, fallback: &'static str) -> ApiError {
	let (status, message) = match find_beacon_error(err) {
		Some(BeaconError::SlotMissedOrDoesNotExist) => (StatusCode::NOT_FOUND, "Slot was missed"),
		Some(BeaconError::DutiesNotFound) => (StatusCode::NOT_FOUND, "Sync duties not found"),
		Some(BeaconError::SlotInFuture) => (StatusCode::BAD_REQUEST, "Slot is in the future"),
		Some(BeaconError::SlotWasMissed) => (StatusCode::BAD_REQUEST, "Slot was missed"),
		_ => (StatusCode::INTERNAL_SERVER_ERROR, fallback),
	};

	ApiError::new(status, message, Some(format!("{:#}", err)))
}

fn parse_slot(raw: &str) -> Result<u64, ApiError> {
	raw.parse::<u64>()
		.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "Invalid slot number", Some(format!("'{raw}': {e}"))))
}

// ---------- Handlers ----------

// GET /health
async fn health<A>(State(api): State<Arc<A>>) -> impl IntoResponse
where
	A: ValidatorApi,
{
	const ENDPOINT: &str = routes::HEALTH;
	const METHOD: &str = "GET";

	let metrics = server_http_metrics();
	let start = metrics.start(ENDPOINT, METHOD);

	match api.health_check().await {
		Ok(()) => {
			metrics.finish_status(ENDPOINT, METHOD, 200, start);
			StatusCode::OK
		}
		Err(e) => {
			error!("Health check failed: {e:#}");
			metrics.finish_status(ENDPOINT, METHOD, 500, start);
			StatusCode::INTERNAL_SERVER_ERROR
		}
	}
}

// GET /metrics
async fn get_metrics() -> Response {
	match encode_registries(&[&*SERVER_METRICS_REGISTRY, &*BEACON_CLIENT_REGISTRY]) {
		Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
		Err(e) => {
			error!("Failed to encode metrics: {e:#}");
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}
	}
}

// GET /api/v1/blockreward/{slot}
async fn get_block_reward<A>(State(api): State<Arc<A>>, Path(slot): Path<String>) -> Response
where
	A: ValidatorApi,
{
	const ENDPOINT: &str = routes::BLOCK_REWARD;
	const METHOD: &str = "GET";

	let metrics = server_http_metrics();
	let start = metrics.start(ENDPOINT, METHOD);

	let slot = match parse_slot(&slot) {
		Ok(slot) => slot,
		Err(api_error) => {
			metrics.finish_status(ENDPOINT, METHOD, api_error.code, start);
			return api_error.into_response();
		}
	};

	match api.get_block_reward(slot).await {
		Ok(result) => {
			debug!(slot, status = %result.status, "Block reward served");
			metrics.finish_status(ENDPOINT, METHOD, StatusCode::OK.as_u16(), start);
			(StatusCode::OK, Json(BlockRewardResponse::from(result))).into_response()
		}
		Err(e) => {
			let api_error = api_error_from_report(&e, BLOCK_REWARD_FAILURE);
			if api_error.status().is_server_error() {
				error!(slot, "Failed to retrieve block reward: {e:#}");
			}
			metrics.finish_status(ENDPOINT, METHOD, api_error.code, start);
			api_error.into_response()
		}
	}
}

// GET /api/v1/syncduties/{slot}
async fn get_sync_duties<A>(State(api): State<Arc<A>>, Path(slot): Path<String>) -> Response
where
	A: ValidatorApi,
{
	const ENDPOINT: &str = routes::SYNC_DUTIES;
	const METHOD: &str = "GET";

	let metrics = server_http_metrics();
	let start = metrics.start(ENDPOINT, METHOD);

	let slot = match parse_slot(&slot) {
		Ok(slot) => slot,
		Err(api_error) => {
			metrics.finish_status(ENDPOINT, METHOD, api_error.code, start);
			return api_error.into_response();
		}
	};

	match api.get_sync_duties(slot).await {
		Ok(validators) => {
			debug!(slot, count = validators.len(), "Sync duties served");
			metrics.finish_status(ENDPOINT, METHOD, StatusCode::OK.as_u16(), start);
			(StatusCode::OK, Json(SyncDutiesResponse { validators })).into_response()
		}
		Err(e) => {
			let api_error = api_error_from_report(&e, SYNC_DUTIES_FAILURE);
			if api_error.status().is_server_error() {
				error!(slot, "Failed to retrieve sync duties: {e:#}");
			}
			metrics.finish_status(ENDPOINT, METHOD, api_error.code, start);
			api_error.into_response()
		}
	}
}
