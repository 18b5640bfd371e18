//! Helpdesk HTTP server.

use helpdesk::admin::AdminService;
use helpdesk::server::{build_router, AppState};
use helpdesk::store::{InMemoryStore, RecordStore};
use helpdesk::Config;
use helpdesk_core::environment::{Clock, IdGenerator, SystemClock, UuidGenerator};
use helpdesk_runtime::metrics::MetricsServer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting helpdesk server");

    if let Some(port) = config.server.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        MetricsServer::new(addr).start()?;
        helpdesk::metrics::describe();
    }

    let store = open_store(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);

    if let Some((email, password)) = config.bootstrap_admin() {
        let admin = AdminService::new(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&ids));
        if let Some(user) = admin.bootstrap_admin(email, password).await? {
            info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");
        }
    }

    let state = AppState::new(
        store,
        clock,
        ids,
        chrono::Duration::minutes(config.auth.token_ttl_minutes),
        config.articles.published_at_policy,
    );
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Open the configured record store.
#[cfg(feature = "postgres")]
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    use helpdesk::store::PostgresStore;

    match &config.database.url {
        Some(url) => {
            info!(max_connections = config.database.max_connections, "Connecting to PostgreSQL");
            let store = PostgresStore::connect(url, config.database.max_connections).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        },
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        },
    }
}

/// Open the configured record store.
#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    if config.database.url.is_some() {
        warn!("DATABASE_URL is set but the postgres feature is disabled, using the in-memory store");
    } else {
        info!("Using the in-memory store");
    }
    Ok(Arc::new(InMemoryStore::new()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
