//! Prometheus metrics endpoint for worldbench
//!
//! Exposes metrics in Prometheus text format at /metrics

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::fmt::Write;
use std::sync::atomic::Ordering;

use super::handlers::AppState;

/// Count every request that reaches the router.
pub async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.request_counter.fetch_add(1, Ordering::Relaxed);
    next.run(request).await
}

fn push_metric(output: &mut String, name: &str, kind: &str, help: &str, value: impl std::fmt::Display) {
    // Writing to a String cannot fail
    let _ = write!(
        output,
        "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n\n"
    );
}

/// Prometheus metrics handler
///
/// Returns metrics in Prometheus text exposition format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut output = String::new();

    push_metric(
        &mut output,
        "worldbench_http_requests_total",
        "counter",
        "Total number of HTTP requests processed",
        state.request_counter.load(Ordering::Relaxed),
    );
    push_metric(
        &mut output,
        "worldbench_uptime_seconds",
        "gauge",
        "Time since server started in seconds",
        format!("{:.3}", state.startup_time.elapsed().as_secs_f64()),
    );

    // Connection pool
    let store = state.dispatcher.store();
    let pool = store.pool().stats();
    push_metric(
        &mut output,
        "worldbench_pool_capacity",
        "gauge",
        "Number of pooled store connections",
        pool.capacity,
    );
    push_metric(
        &mut output,
        "worldbench_pool_in_use",
        "gauge",
        "Connections currently checked out",
        pool.in_use,
    );
    push_metric(
        &mut output,
        "worldbench_pool_peak_in_use",
        "gauge",
        "Highest number of simultaneous checkouts",
        pool.peak_in_use,
    );
    push_metric(
        &mut output,
        "worldbench_pool_checkouts_total",
        "counter",
        "Total number of connection checkouts",
        pool.total_checkouts,
    );

    // Row traffic
    let counters = store.counters();
    push_metric(
        &mut output,
        "worldbench_rows_read_total",
        "counter",
        "World rows fetched",
        counters.rows_read.load(Ordering::Relaxed),
    );
    push_metric(
        &mut output,
        "worldbench_rows_updated_total",
        "counter",
        "World rows updated",
        counters.rows_updated.load(Ordering::Relaxed),
    );
    push_metric(
        &mut output,
        "worldbench_fortune_reads_total",
        "counter",
        "Full reads of the Fortune table",
        counters.fortune_reads.load(Ordering::Relaxed),
    );

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_format() {
        let mut output = String::new();
        push_metric(&mut output, "worldbench_test_total", "counter", "Test counter", 42);
        assert_eq!(
            output,
            "# HELP worldbench_test_total Test counter\n# TYPE worldbench_test_total counter\nworldbench_test_total 42\n\n"
        );
    }
}
