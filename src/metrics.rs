//! Prometheus metrics for camgate.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides an axum middleware for HTTP RED
//! metrics, and exposes the `/metrics` endpoint handler.
//!
//! Recording is always safe: until [`init_metrics`] runs, the `metrics`
//! macros are no-ops.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

use crate::routing::{classify, Route};

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, route, status.
pub const HTTP_REQUESTS_TOTAL: &str = "camgate_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, route.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "camgate_http_request_duration_seconds";

/// Object store failures (counter). Labels: operation (list, get, stream).
pub const STORE_ERRORS_TOTAL: &str = "camgate_store_errors_total";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent -- safe to call
/// multiple times (e.g. in tests).
pub fn init_metrics() -> anyhow::Result<&'static PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(STORE_ERRORS_TOTAL, "Object store failures by operation");
}

/// Count one failed store operation.
pub fn record_store_error(operation: &'static str) {
    counter!(STORE_ERRORS_TOTAL, "operation" => operation).increment(1);
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes `/metrics` from self-instrumentation to avoid feedback loops.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let route = route_label(req.uri().path());

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "route" => route,
        "status" => status
    )
    .increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "route" => route)
        .record(duration);

    response
}

// -- Route labels -------------------------------------------------------------

/// Collapse a request path to its route class for metric labels.
///
/// - `/` -> `/`
/// - `/2024/05/01` -> `/{date}`
/// - `/2024/05/01/a.jpg` -> `/{date}/{file}`
/// - anything else -> `other`
fn route_label(path: &str) -> &'static str {
    match classify(path) {
        Route::Root => "/",
        Route::DateListing(_) => "/{date}",
        Route::DateObject { .. } => "/{date}/{file}",
        Route::Unmatched => "other",
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler() -> Response {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => crate::errors::not_found(),
    }
}

// -- Tests --------------------------------------------------------------------
