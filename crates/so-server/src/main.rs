//! Service Orders server
//!
//! Wires configuration, the record store, report delivery and the HTTP API
//! into one axum application.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use so_api::AppState;
use so_core::config::{AppConfig, StoreBackend};
use so_db::{
    ChangeFeed, Database, DatabaseConfig, MemoryRecordStore, ObservedStore, PgRecordStore,
    RecordStore,
};
use so_reports::{
    ConsoleEmailSender, DispatchSettings, EmailSender, HttpDocumentRenderer, ReportDispatcher,
    ReportPage, SmtpEmailSender, WhatsAppCloudClient,
};

mod health;

use health::{Channels, HealthChecker, HealthConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.database.backend,
        policy = ?config.orders.association_policy,
        "Starting Service Orders"
    );

    let database = match config.database.backend {
        StoreBackend::Postgres => {
            let db = Database::connect(&DatabaseConfig::from_app_config(&config.database)).await?;
            info!("Connected to database");
            Some(db)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on shutdown");
            None
        }
    };

    let (state, checker) = build_state(&config, database.clone())?;
    let app = build_router(state, Arc::new(checker));

    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,so_server=debug,so_api=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Build the API state and health checker for a configuration
///
/// Without a database the in-memory store is used.
fn build_state(
    config: &AppConfig,
    database: Option<Database>,
) -> anyhow::Result<(AppState, HealthChecker)> {
    let feed = ChangeFeed::new(config.feed.capacity);
    let store: Arc<dyn RecordStore> = match &database {
        Some(db) => Arc::new(ObservedStore::new(PgRecordStore::new(db.pool().clone()), feed.clone())),
        None => Arc::new(ObservedStore::new(MemoryRecordStore::new(), feed.clone())),
    };

    let email: Arc<dyn EmailSender> = match &config.email.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "SMTP delivery enabled");
            Arc::new(SmtpEmailSender::new(smtp)?)
        }
        None => {
            warn!("SMTP not configured; email reports will be refused");
            Arc::new(ConsoleEmailSender::new())
        }
    };
    let channels = Channels {
        smtp: email.is_configured(),
        whatsapp: config.whatsapp.is_some(),
    };

    let renderer = Arc::new(HttpDocumentRenderer::new(config.reports.renderer_url.clone()));
    let mut dispatcher = ReportDispatcher::new(
        store.clone(),
        renderer,
        email,
        DispatchSettings::from_config(config),
    );
    if let Some(whatsapp) = &config.whatsapp {
        info!(api_version = %whatsapp.api_version, "WhatsApp delivery enabled");
        dispatcher = dispatcher.with_messaging(Arc::new(WhatsAppCloudClient::new(whatsapp.clone())));
    }

    let mut checker = HealthChecker::new(HealthConfig::default(), store.clone(), feed.clone())
        .with_channels(channels);
    if let Some(db) = database {
        checker = checker.with_database(db);
    }

    let state = AppState::new(
        store,
        feed,
        config.orders.association_policy,
        Arc::new(dispatcher),
        Arc::new(ReportPage::new()?),
    );
    Ok((state, checker))
}

/// Build the application router
fn build_router(state: AppState, checker: Arc<HealthChecker>) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(checker);

    Router::new()
        .merge(health_routes)
        .merge(so_api::router().with_state(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
