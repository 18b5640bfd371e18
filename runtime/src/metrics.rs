//! Prometheus exporter.
//!
//! [`MetricsServer::start`] installs the global `metrics` recorder and serves
//! the scrape endpoint. Counters recorded before (or without) it are dropped.

use metrics::describe_counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// The exporter could not be set up.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Listener or recorder setup failed
    #[error("failed to install Prometheus exporter on {addr}: {source}")]
    Install {
        /// Requested scrape address
        addr: SocketAddr,
        /// Exporter error
        #[source]
        source: BuildError,
    },
}

/// Scrape endpoint at `http://<addr>/metrics`.
///
/// ```rust,no_run
/// # async fn run() -> Result<(), helpdesk_runtime::metrics::MetricsError> {
/// helpdesk_runtime::metrics::MetricsServer::new(([0, 0, 0, 0], 9090).into()).start()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Exporter that will listen on `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Install the recorder and spawn the listener. Needs a tokio runtime.
    ///
    /// A second call in the same process finds the recorder taken; that is
    /// logged and treated as success.
    ///
    /// # Errors
    ///
    /// [`MetricsError::Install`] when the listener cannot be set up.
    pub fn start(self) -> Result<(), MetricsError> {
        match PrometheusBuilder::new().with_http_listener(self.addr).install() {
            Ok(()) => {
                describe_counter!(
                    "helpdesk_effects_executed_total",
                    "Effects run after a reducer step, labelled by kind"
                );
                tracing::info!(addr = %self.addr, "Prometheus exporter listening");
                Ok(())
            },
            Err(BuildError::FailedToSetGlobalRecorder(_)) => {
                tracing::warn!("Metrics recorder already installed");
                Ok(())
            },
            Err(source) => Err(MetricsError::Install {
                addr: self.addr,
                source,
            }),
        }
    }

    /// Scrape address
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Counters for the effect executor.
pub struct EffectMetrics;

impl EffectMetrics {
    /// One effect of `kind` ran.
    pub fn record_execution(kind: &'static str) {
        counter!("helpdesk_effects_executed_total", "kind" => kind).increment(1);
    }
}
