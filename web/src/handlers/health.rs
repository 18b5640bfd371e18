//! Liveness and readiness responses.

use axum::{Json, http::StatusCode};
use helpdesk_runtime::HealthReport;

/// `GET /health`: the process is up. Touches no dependency.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness report as a response: 200 while healthy or degraded, 503 once
/// any check is unhealthy.
///
/// ```json
/// {
///   "status": "healthy",
///   "checks": [{ "component": "record_store", "status": "healthy" }],
///   "timestamp": "2025-01-01T00:00:00Z"
/// }
/// ```
#[must_use]
pub fn readiness_response(report: HealthReport) -> (StatusCode, Json<HealthReport>) {
    let status = if report.status.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(report))
}
