//! Database migration command.

use anyhow::Context;

use ecofinds_infra::{PgMarketStore, StoreConfig};

pub async fn run() -> anyhow::Result<()> {
    let config = StoreConfig::from_env()?;

    tracing::info!("connecting to marketplace database");
    let store = PgMarketStore::connect(&config)
        .await
        .context("failed to connect")?;

    tracing::info!("running marketplace migrations");
    store.migrate().await?;

    tracing::info!("migrations complete");
    Ok(())
}
