/**
 * Homebound Sync Daemon Entry Point
 *
 * Runs the sync engine headless: loads configuration from the environment,
 * starts the debounce/poll loops, and keeps the local vault mirrored to the
 * remote store until interrupted.
 */

use std::sync::Arc;

use homebound::config::SyncConfig;
use homebound::remote::HttpBlobStore;
use homebound::sync::SyncEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = SyncConfig::from_env()?;
    if config.api_key.is_none() {
        tracing::warn!("HOMEBOUND_API_KEY is not set; remote sync will fail until it is");
    }
    tracing::info!("data dir: {}", config.data_dir.display());
    tracing::info!("remote: {}", config.server_url);

    let remote = Arc::new(HttpBlobStore::from_config(&config)?);
    let engine = SyncEngine::new(config, remote)?;

    let snapshot = engine.document().await;
    if snapshot.settings.has_onboarded {
        tracing::info!("vault identity: {}", snapshot.settings.email);
    } else {
        tracing::warn!("vault is not onboarded yet; sync stays dormant");
    }

    engine.start().await;
    tracing::info!("sync engine running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    engine.stop();

    Ok(())
}
