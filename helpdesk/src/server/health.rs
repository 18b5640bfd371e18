//! Readiness endpoint.
//!
//! `GET /health` is the plain liveness check from `helpdesk-web`; readiness
//! additionally pings the record store.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use helpdesk_runtime::{HealthCheck, HealthReport};
use helpdesk_web::handlers::health::readiness_response;

/// Readiness check.
///
/// ```bash
/// curl http://localhost:8000/ready
/// # {"status":"healthy","checks":[{"component":"record_store","status":"healthy"}],...}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let store = match state.store.ping().await {
        Ok(()) => HealthCheck::healthy("record_store"),
        Err(error) => {
            tracing::warn!(error = %error, "Record store ping failed");
            HealthCheck::unhealthy("record_store", error.to_string())
        },
    };

    readiness_response(HealthReport::new(vec![store], state.clock.now()))
}
