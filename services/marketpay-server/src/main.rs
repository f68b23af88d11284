//! MarketPay settlement server
//!
//! Wires the settlement core together: in-memory datastore, payment
//! reconciler, dispute controller, the auto-release scheduler and the REST
//! surface, with graceful shutdown for both the HTTP server and the
//! scheduler loop.
//!
//! ```bash
//! # Start with defaults
//! marketpay-server
//!
//! # Environment overrides
//! MARKETPAY__SERVER__PORT=8080 MARKETPAY__PROVIDER__WEBHOOK_SECRET=whsec_x marketpay-server
//! ```

mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use marketpay_api::{create_router, AppState};
use marketpay_orders::TracingNotifier;
use marketpay_reconciler::{HttpProviderClient, PollConfig};
use marketpay_scheduler::AutoReleaseJob;
use marketpay_store::Datastore;

use crate::config::ServerConfig;

/// MarketPay settlement server
#[derive(Parser, Debug)]
#[command(name = "marketpay-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "MARKETPAY_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "MARKETPAY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MARKETPAY_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MARKETPAY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Webhook signing secret shared with the payment provider
    #[arg(long, env = "MARKETPAY_WEBHOOK_SECRET")]
    webhook_secret: Option<String>,

    /// Shared key for admin dispute endpoints
    #[arg(long, env = "MARKETPAY_ADMIN_KEY")]
    admin_key: Option<String>,

    /// Allow placeholder secrets (development only)
    #[arg(long, env = "MARKETPAY_DEV_MODE")]
    dev_mode: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(level) = args.log_level {
        server_config.logging.level = level;
    }
    if let Some(secret) = args.webhook_secret {
        server_config.provider.webhook_secret = secret;
    }
    if let Some(key) = args.admin_key {
        server_config.settlement.admin_key = key;
    }

    init_logging(&server_config.logging);
    validate_config(&server_config, args.dev_mode)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting MarketPay settlement server"
    );

    let store = Datastore::new();
    let notifier = Arc::new(TracingNotifier);
    let provider = Arc::new(HttpProviderClient::new(
        server_config.provider.base_url.clone(),
        server_config.provider.api_key.clone(),
    ));
    let poll = PollConfig {
        interval: server_config.provider.poll_interval(),
        max_attempts: server_config.provider.poll_max_attempts,
    };

    let state = Arc::new(AppState::new(
        store.clone(),
        notifier.clone(),
        provider,
        poll,
        server_config.provider.webhook_secret.clone(),
        server_config.settlement.admin_key.clone(),
    ));

    // Auto-release scheduler with its own shutdown signal.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = AutoReleaseJob::new(
        store,
        notifier,
        server_config.settlement.sweep_interval(),
    )
    .spawn(shutdown_rx);

    let app = create_router(state);
    let addr = server_config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        host = %server_config.server.host,
        port = server_config.server.port,
        "server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    scheduler.await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn init_logging(config: &config::LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = tracing_subscriber::registry().with(env_filter);
    match config.format.as_str() {
        "json" => subscriber.with(fmt::layer().json().with_target(true)).init(),
        _ => subscriber.with(fmt::layer().with_target(true)).init(),
    }
}

fn validate_config(config: &ServerConfig, dev_mode: bool) -> anyhow::Result<()> {
    if !dev_mode {
        if config.provider.webhook_secret == "change-me-in-production" {
            anyhow::bail!(
                "webhook secret must be set in production (MARKETPAY__PROVIDER__WEBHOOK_SECRET)"
            );
        }
        if config.settlement.admin_key == "change-me-in-production" {
            anyhow::bail!(
                "admin key must be set in production (MARKETPAY__SETTLEMENT__ADMIN_KEY)"
            );
        }
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_port() {
        let args = Args::parse_from(["marketpay-server", "--port", "8080"]);
        assert_eq!(args.port, Some(8080));
    }

    #[test]
    fn placeholder_secrets_fail_outside_dev_mode() {
        let config = ServerConfig::default();
        assert!(validate_config(&config, false).is_err());
        assert!(validate_config(&config, true).is_ok());
    }
}
