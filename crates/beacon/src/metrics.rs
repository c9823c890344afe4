use lazy_static::lazy_static;
use prometheus::{
	HistogramVec, IntCounterVec, Registry, register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
};

use common::metrics::HttpMetrics;

pub const BEACON_CLIENT_REGISTRY_NAME: &str = "beacon_client";

lazy_static! {
	pub static ref BEACON_CLIENT_REGISTRY: Registry =
		Registry::new_custom(Some(BEACON_CLIENT_REGISTRY_NAME.to_string()), None).unwrap();

	pub static ref BEACON_CLIENT_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
		"requests_total",
		"Total HTTP requests to the beacon node by route and method",
		&["endpoint", "method"],
		BEACON_CLIENT_REGISTRY
	)
	.unwrap();

	pub static ref BEACON_CLIENT_RESPONSES_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
		"responses_total",
		"Total HTTP responses from the beacon node by route, method, and status",
		&["endpoint", "method", "status"],
		BEACON_CLIENT_REGISTRY
	)
	.unwrap();

	pub static ref BEACON_CLIENT_LATENCY_SECONDS: HistogramVec = register_histogram_vec_with_registry!(
		"latency_seconds",
		"HTTP request latency to the beacon node in seconds by route and method",
		&["endpoint", "method"],
		BEACON_CLIENT_REGISTRY
	)
	.unwrap();
}

pub fn beacon_client_metrics() -> HttpMetrics {
	HttpMetrics {
		requests: &BEACON_CLIENT_REQUESTS_TOTAL,
		responses: &BEACON_CLIENT_RESPONSES_TOTAL,
		latency: &BEACON_CLIENT_LATENCY_SECONDS,
	}
}
