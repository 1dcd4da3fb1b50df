//! `huly-bridge`: composition root.
//!
//! Loads settings, installs logging, builds the client registry and serves
//! the manifest API until SIGINT or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use huly_rpc::huly::HulyApi;
use huly_rpc::{create_websocket_transport, server, ClientRegistry, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::parse();

    let registry = ClientRegistry::new(create_websocket_transport(), settings.request_timeout());
    let client = registry.client(&settings.huly_ws_url);
    let api = HulyApi::new(client);

    let addr = settings.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Huly bridge started, backend at {}", settings.huly_ws_url);

    server::serve(listener, api, shutdown_signal())
        .await
        .context("manifest server failed")?;

    tracing::info!("shutting down gracefully");
    registry.close_all();

    Ok(())
}

async fn shutdown_signal() {
    // ---
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for SIGINT: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
