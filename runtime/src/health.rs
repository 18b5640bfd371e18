//! Component health, as reported by `GET /ready`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Status of one component or of the whole service.
///
/// Ordered from best to worst, so the overall status is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Working normally
    Healthy,
    /// Working, but slow or partially failing
    Degraded,
    /// Not working
    Unhealthy,
}

impl HealthStatus {
    /// Whether the service can take traffic in this status.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        !matches!(self, Self::Unhealthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        })
    }
}

/// Result of probing one component (`record_store`, `session_store`).
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Component name
    pub component: String,
    /// Probe outcome
    pub status: HealthStatus,
    /// Failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    fn with(component: impl Into<String>, status: HealthStatus, message: Option<String>) -> Self {
        Self {
            component: component.into(),
            status,
            message,
        }
    }

    /// Component answered normally.
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self::with(component, HealthStatus::Healthy, None)
    }

    /// Component answered, with a problem worth reporting.
    #[must_use]
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with(component, HealthStatus::Degraded, Some(message.into()))
    }

    /// Component did not answer.
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with(component, HealthStatus::Unhealthy, Some(message.into()))
    }
}

/// Every probe plus the worst status among them.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Worst status of all checks; healthy when there are none
    pub status: HealthStatus,
    /// Individual probes
    pub checks: Vec<HealthCheck>,
    /// When the probes ran
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Aggregate `checks` taken at `timestamp`.
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>, timestamp: DateTime<Utc>) -> Self {
        let status = checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            checks,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::environment::Clock;
    use helpdesk_testing::test_clock;

    #[test]
    fn worst_check_wins() {
        let now = test_clock().now();
        let report = HealthReport::new(
            vec![
                HealthCheck::healthy("record_store"),
                HealthCheck::degraded("session_store", "slow"),
            ],
            now,
        );
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report.status.is_ready());

        let report = HealthReport::new(vec![HealthCheck::unhealthy("record_store", "refused")], now);
        assert_eq!(report.status.to_string(), "unhealthy");
        assert!(!report.status.is_ready());
    }

    #[test]
    fn no_checks_means_healthy() {
        let report = HealthReport::new(Vec::new(), test_clock().now());
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[test]
    fn serializes_lowercase_and_omits_empty_messages() {
        let report = HealthReport::new(vec![HealthCheck::healthy("record_store")], test_clock().now());
        let json = serde_json::to_value(&report).unwrap_or_default();

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["checks"][0], serde_json::json!({ "component": "record_store", "status": "healthy" }));
    }
}
