use std::time::Instant;

use eyre::{Result, WrapErr};
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};

/// Records request count, latency and response status for one side of an
/// HTTP exchange (our server, or a client talking to an upstream node).
#[derive(Clone, Copy)]
pub struct HttpMetrics {
    pub requests: &'static IntCounterVec,
    pub responses: &'static IntCounterVec,
    pub latency: &'static HistogramVec,
}

impl HttpMetrics {
    pub fn start(&self, endpoint: &'static str, method: &'static str) -> Instant {
        self.requests.with_label_values(&[endpoint, method]).inc();
        Instant::now()
    }

    pub fn finish_status(
        &self,
        endpoint: &'static str,
        method: &'static str,
        status: u16,
        start: Instant,
    ) {
        self.finish_label(endpoint, method, &status.to_string(), start);
    }

    /// Used when no status code exists, e.g. the connection never completed.
    pub fn finish_label(
        &self,
        endpoint: &'static str,
        method: &'static str,
        status_label: &str,
        start: Instant,
    ) {
        self.latency
            .with_label_values(&[endpoint, method])
            .observe(start.elapsed().as_secs_f64());

        self.responses
            .with_label_values(&[endpoint, method, status_label])
            .inc();
    }
}

/// Render every metric family of `registries` in the Prometheus text format.
pub fn encode_registries(registries: &[&Registry]) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    for registry in registries {
        encoder
            .encode(&registry.gather(), &mut buffer)
            .wrap_err("Failed to encode metrics")?;
    }

    String::from_utf8(buffer).wrap_err("Metrics output is not valid UTF-8")
}
