//! assetscout HTTP server.
//!
//! Loads the config from `$ASSETSCOUT_CONFIG` or
//! `~/.config/assetscout/config.toml` (defaults when absent) and serves the
//! search API until Ctrl-C. Tracing goes to stderr; set `RUST_LOG` to
//! change the level.

use assetscout::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("assetscout-server starting");

    let config = ServiceConfig::load()
        .map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;

    assetscout::server::run(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
        tracing::info!("shutdown requested");
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "assetscout-server exited with error");
        anyhow::anyhow!("assetscout-server failed: {e}")
    })?;

    tracing::info!("assetscout-server shut down cleanly");
    Ok(())
}
