use clap::Parser;
use sigrelay_hub::Broadcaster;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod app;
mod http;
mod sse;

/// Relay trading-signal webhooks to browsers over Server-Sent Events.
#[derive(Parser)]
#[command(name = "sigrelay-gateway", version)]
struct Cli {
    /// TOML config file (defaults to ./sigrelay.toml).
    #[arg(long, env = "SIGRELAY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sigrelay_gateway=info,sigrelay_hub=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config =
        sigrelay_core::RelayConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
            warn!("Config load failed ({}), using defaults", e);
            sigrelay_core::RelayConfig::default()
        });

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!(
        keepalive_secs = config.hub.keepalive_secs,
        subscriber_buffer = config.hub.subscriber_buffer,
        cors = config.gateway.cors,
        "relay configured"
    );

    let state = Arc::new(app::AppState::new(config));
    let router = app::build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("sigrelay gateway listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state.broadcaster.clone()))
        .await?;

    info!("sigrelay gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, then close every subscriber so open event
/// streams end and the graceful drain can finish.
async fn shutdown_signal(broadcaster: Broadcaster) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
    broadcaster.close_all();
}
