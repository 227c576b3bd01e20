use axum::response::IntoResponse;
use lazy_static::lazy_static;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge, Encoder, HistogramVec, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    pub static ref SCORES_TOTAL: IntCounterVec =
        register_int_counter_vec!(
            opts!("goguma_reputation_scores_total", "Charm temperatures computed, by the path that produced them"),
            &["source"]
        ).unwrap();

    pub static ref FALLBACK_FAILURES_TOTAL: IntCounterVec =
        register_int_counter_vec!(
            opts!("goguma_reputation_fallback_failures_total", "Fallback lookups that failed and degraded to the base score"),
            &["stage"]
        ).unwrap();

    pub static ref CACHE_HITS_TOTAL: IntCounter =
        register_int_counter!(
            opts!("goguma_reputation_cache_hits_total", "Charm temperature cache hits")
        ).unwrap();

    pub static ref CACHE_MISSES_TOTAL: IntCounter =
        register_int_counter!(
            opts!("goguma_reputation_cache_misses_total", "Charm temperature cache misses")
        ).unwrap();

    pub static ref CACHE_ENTRIES: IntGauge =
        register_int_gauge!(
            opts!("goguma_reputation_cache_entries", "Sellers currently held in the charm temperature cache")
        ).unwrap();

    pub static ref BACKEND_REQUEST_DURATION_SECONDS: HistogramVec =
        register_histogram_vec!(
            histogram_opts!(
                "goguma_backend_request_duration_seconds",
                "Latency of requests to the hosted marketplace database",
                vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
            ),
            &["operation"]
        ).unwrap();
}

pub fn record_score(source: &str) {
    SCORES_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_fallback_failure(stage: &str) {
    FALLBACK_FAILURES_TOTAL.with_label_values(&[stage]).inc();
}

pub fn record_cache_hit() {
    CACHE_HITS_TOTAL.inc();
}

pub fn record_cache_miss() {
    CACHE_MISSES_TOTAL.inc();
}

pub fn set_cache_entries(entries: usize) {
    CACHE_ENTRIES.set(entries as i64);
}

pub fn observe_backend_request(operation: &str, duration_secs: f64) {
    BACKEND_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Renders the default registry in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode Prometheus metrics: {}", e);
        return format!("# ERROR: Failed to encode metrics: {}\n", e);
    }
    match String::from_utf8(buffer) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to convert Prometheus buffer to UTF-8: {}", e);
            "# ERROR: Failed to convert buffer to UTF-8\n".to_string()
        }
    }
}

/// Handler for `GET /metrics`.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render(),
    )
}
