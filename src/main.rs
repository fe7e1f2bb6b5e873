//! Blocks server binary.
//!
//! Loads configuration, builds the configured storage backend and serves the REST API
//! until Ctrl-C or SIGTERM.
//!
//! # Environment Variables
//! - `BLOCKS_CONFIG`: YAML configuration file (default: `blocks.yaml`)
//! - `BLOCKS_*`: configuration overrides, e.g. `BLOCKS_HTTP__PORT=9000`
//! - `RUST_LOG`: log filter (default: `info` for the workspace crates)
//! - `DEBUG=1`: human-readable debug logs instead of JSON lines

use api_rest::{AppInfo, AppState, ServerConfig};
use blocks_core::new_block_manager;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_TARGETS: &[&str] = &["blocks_run", "api_rest", "blocks_core", "tower_http"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = ServerConfig::load()?;
    let manager = new_block_manager(&config.storage)?;

    let state = AppState::new(manager, AppInfo::new(env!("CARGO_PKG_VERSION")));
    let app = api_rest::router(state, config.http.max_upload_size);

    let addr = config.http.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        storage = %config.storage.kind,
        "++ Listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Server stopped");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let debug = std::env::var("DEBUG").is_ok_and(|v| v == "1");
    let level = if debug { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect();
        EnvFilter::try_new(directives.join(","))
    })?;

    let (pretty, json) = if debug {
        let layer = fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true);
        (Some(layer), None)
    } else {
        (None, Some(fmt::layer().json()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received");
}
