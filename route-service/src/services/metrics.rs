//! Prometheus metrics for route-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP request counter by method, matched route and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "route_service_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// HTTP request duration histogram by method and matched route.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "route_service_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register http_request_duration")
});

/// Successful lifecycle transitions by audit action.
pub static ROUTE_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "route_service_route_transitions_total",
        "Total number of route lifecycle transitions",
        &["action"]
    )
    .expect("Failed to register route_transitions_total")
});

/// Audit entries that could not be persisted.
pub static AUDIT_WRITE_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "route_service_audit_write_failures_total",
        "Total number of audit entries that failed to persist",
        &["action"]
    )
    .expect("Failed to register audit_write_failures")
});

/// Cache invalidation publishes that failed.
pub static CACHE_INVALIDATION_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "route_service_cache_invalidation_failures_total",
        "Total number of failed cache invalidation publishes",
        &["channel"]
    )
    .expect("Failed to register cache_invalidation_failures")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "route_service_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&ROUTE_TRANSITIONS_TOTAL);
    Lazy::force(&AUDIT_WRITE_FAILURES);
    Lazy::force(&CACHE_INVALIDATION_FAILURES);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
