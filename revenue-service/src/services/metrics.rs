//! Prometheus metrics for revenue-service.
//!
//! HTTP middleware records through the `metrics` facade (rendered by the
//! installed recorder); refresh and provider counters live in the default
//! `prometheus` registry. `/metrics` serves both.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Completed dashboard refreshes by outcome.
pub static REFRESHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "revenue_refreshes_total",
        "Total dashboard refreshes by outcome",
        &["status"]
    )
    .expect("Failed to register revenue_refreshes_total")
});

pub static REFRESH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "revenue_refresh_duration_seconds",
        "Wall time of one full dashboard refresh in seconds",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register revenue_refresh_duration_seconds")
});

/// Provider list calls by resource and outcome.
pub static PROVIDER_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "revenue_provider_requests_total",
        "Total billing provider list requests by resource and outcome",
        &["resource", "outcome"]
    )
    .expect("Failed to register revenue_provider_requests_total")
});

/// Install the recorder and register every metric. Safe to call more than once.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    });

    Lazy::force(&REFRESHES_TOTAL);
    Lazy::force(&REFRESH_DURATION);
    Lazy::force(&PROVIDER_REQUESTS_TOTAL);
}

/// All metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode prometheus registry");
    }
    output.push_str(&String::from_utf8_lossy(&buffer));

    output
}

pub fn record_refresh(status: &str, duration_secs: f64) {
    REFRESHES_TOTAL.with_label_values(&[status]).inc();
    REFRESH_DURATION.observe(duration_secs);
}

pub fn record_provider_request(resource: &str, outcome: &str) {
    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&[resource, outcome])
        .inc();
}
