use std::sync::Arc;
use std::time::Duration;

use database::Database;
use ingest::{Archiver, DispatchError, DispatcherConfig, EventDispatcher, IngestConfig};
use object_store::S3Store;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wa_bridge::BridgeClient;

/// Interval between bridge health checks.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting ingestd v{}", ingest::version());
    let config = IngestConfig::from_env()?;

    if let Some(dir) = config.database_dir() {
        std::fs::create_dir_all(dir)?;
    }
    let db = Database::connect_with_pool_size(&config.database_url, config.db_pool_size).await?;
    db.migrate().await?;

    info!("Connecting to bridge daemon at {}", config.bridge.base_url);
    let client = BridgeClient::connect(config.bridge.clone()).await?;

    let dispatcher_config = match client.get_self_jid().await {
        Ok(jid) => {
            info!("Archiving for account {}", jid);
            DispatcherConfig::with_own_user(jid.user)
        }
        Err(e) => {
            warn!("Could not determine the paired account: {}", e);
            DispatcherConfig::default()
        }
    };

    let _health_monitor = client.start_health_monitor(HEALTH_CHECK_INTERVAL);

    let store = S3Store::from_env().await;
    let archiver = Archiver::new(client.clone(), store, config.archive.clone());
    let dispatcher = Arc::new(EventDispatcher::new(
        db.clone(),
        client.clone(),
        archiver,
        dispatcher_config,
    ));

    let events = wa_bridge::subscribe(&client).map_err(DispatchError::Bridge)?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let result = dispatcher.run_with_shutdown(events, shutdown).await;
    db.close().await;
    result?;

    info!("Shutdown complete");
    Ok(())
}
