//! PAJSK Report Server
//!
//! Single-endpoint service that delivers a student's PAJSK report, either as
//! a signed storage link or as a PDF generated on the fly.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pajsk_report_server::config::{Config, DeliveryMode};
use pajsk_report_server::db::{self, PgRecordStore, RecordStore};
use pajsk_report_server::state::AppState;
use pajsk_report_server::storage::{BlobStore, S3Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pajsk_report_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        e
    })?;

    tracing::info!("Starting PAJSK Report Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Delivery mode: {}", config.report.mode);

    // Initialize record store
    let pool = db::create_pool(&config.database).context("Failed to initialize database pool")?;
    let records: Arc<dyn RecordStore> =
        Arc::new(PgRecordStore::new(pool, &config.database.records_table));
    tracing::info!("Record table: {}", config.database.records_table);

    // Initialize S3 client, only needed for signed links
    let blobs: Option<Arc<dyn BlobStore>> = match (&config.storage, config.report.mode) {
        (Some(storage), DeliveryMode::Link) => {
            tracing::info!("S3 endpoint: {}", storage.endpoint);
            let client = S3Client::new(storage).await;
            tracing::info!("S3 bucket: {}", client.bucket());
            let client: Arc<dyn BlobStore> = Arc::new(client);
            Some(client)
        }
        _ => None,
    };

    let app = pajsk_report_server::app(AppState::new(config.clone(), records, blobs));

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    tracing::info!("PAJSK Report Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
