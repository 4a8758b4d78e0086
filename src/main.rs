//! Lagwatch job
//!
//! Run with: cargo run
//!
//! Intended to be started by an external scheduler (cron or similar); each
//! invocation checks every monitored table once and exits with status 0.
//!
//! Environment variables:
//! - LAGWATCH_CONFIG: Configuration file (default: /etc/lagwatch/lagwatch.toml)
//! - RUST_LOG: Log level (default: info)
//!
//! Required configuration keys:
//! - `[warehouse]`: host, dbname, user, password (port defaults to 5439,
//!   sslmode to "prefer")
//! - `[email]`: smtp_host, smtp_username, smtp_password, recipient (smtp_port
//!   defaults to 465)
//! - `[chat]`: webhook_url
//! - `[monitor.<name>]`: table, database, host (replication_task optional)

use lagwatch::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lagwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = Settings::path_from_env();
    tracing::info!(config = %config_path, version = env!("CARGO_PKG_VERSION"), "Lagwatch");

    lagwatch::run_job(&config_path).await;
}
