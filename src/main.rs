use bayanihan_relief::api::{router, AppState};
use bayanihan_relief::config::Config;
use bayanihan_relief::store;

use tokio::signal;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present, before reading LOG_DIR
    let dotenv_result = dotenvy::dotenv();

    // Load configuration
    let config = Config::from_env()?;

    let _guard = init_logging(&config);

    if let Err(e) = dotenv_result {
        warn!("No .env file found or error loading it: {}", e);
    }

    let socket_addr = config.socket_addr()?;

    info!("Starting Bayanihan Relief API on {}", socket_addr);
    info!("Validation mode: {:?}", config.validation_mode);
    info!("Max list limit: {}", config.max_list_limit);
    info!("Allowed CORS origins: {:?}", config.cors_allowed_origins);

    // A missing or unreachable store is reported, not fatal
    let document_store = store::connect(&config).await;

    let app = router(AppState::new(config, document_store));

    // Create listener
    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Console logging always; JSON file logging with daily rotation when
/// `LOG_DIR` is set. The returned guard must live as long as the process.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bayanihan_relief=debug,tower_http=debug"));

    let console = fmt::layer().with_target(true).with_thread_ids(true);

    let Some(log_dir) = config.log_dir.as_ref() else {
        tracing_subscriber::registry().with(filter).with(console).init();
        return None;
    };

    // Create log directory if it doesn't exist
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Warning: Could not create log directory {}: {}", log_dir.display(), e);
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "bayanihan-relief.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        // File output with JSON format for easy parsing
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {}", log_dir.display());

    Some(guard)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
