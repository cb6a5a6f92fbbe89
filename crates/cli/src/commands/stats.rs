//! Profile statistics for one user, printed as JSON.

use anyhow::Context;

use ecofinds_core::{ActorContext, UserId};
use ecofinds_impact::ImpactEstimator;
use ecofinds_infra::{Marketplace, PgMarketStore, StoreConfig};

pub async fn run(user: UserId) -> anyhow::Result<()> {
    let config = StoreConfig::from_env()?;
    let store = PgMarketStore::connect(&config)
        .await
        .context("failed to connect")?;
    let market = Marketplace::new(store, ImpactEstimator::default());

    let stats = market.profile.profile_stats(&ActorContext::user(user)).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
