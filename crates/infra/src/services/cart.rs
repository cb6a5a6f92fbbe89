use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use ecofinds_cart::{CartEntry, CartLine, CartSummary};
use ecofinds_core::{ActorContext, CartEntryId, ProductId};
use ecofinds_impact::ImpactEstimator;

use super::query::load_cart_lines;
use crate::error::{MarketError, MarketResult};
use crate::store::{CartSelector, LockScope, MarketStore};

/// Cart totals as shown next to the checkout button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartOverview {
    pub summary: CartSummary,
    /// Freshly drawn on every call; not stable across reads.
    pub estimated_co2_kg: u64,
}

/// Per-user cart operations.
///
/// Every mutation runs under the user's partition lock, so it never interleaves
/// with a checkout for the same user.
#[derive(Debug, Clone)]
pub struct CartStore<S> {
    store: S,
    estimator: ImpactEstimator,
}

impl<S: MarketStore> CartStore<S> {
    pub fn new(store: S, estimator: ImpactEstimator) -> Self {
        Self { store, estimator }
    }

    #[instrument(
        skip(self, actor),
        fields(user_id = ?actor.user_id()),
        err(level = "warn")
    )]
    pub async fn add_to_cart(
        &self,
        actor: &ActorContext,
        product_id: ProductId,
    ) -> MarketResult<CartEntry> {
        let user_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::User(user_id)).await?;

        let product = tx
            .get_product(product_id)
            .await?
            .ok_or(MarketError::NotFound)?;
        let existing = tx.select_cart_entries(user_id).await?;
        let entry = CartEntry::add(CartEntryId::new(), user_id, &product, &existing, Utc::now())?;

        tx.insert_cart_entry(&entry).await?;
        tx.commit().await?;

        info!(entry_id = %entry.id, "added to cart");
        Ok(entry)
    }

    /// Remove one of the caller's own entries; another user's entry is `NotFound`.
    #[instrument(
        skip(self, actor),
        fields(user_id = ?actor.user_id()),
        err(level = "warn")
    )]
    pub async fn remove_from_cart(
        &self,
        actor: &ActorContext,
        entry_id: CartEntryId,
    ) -> MarketResult<()> {
        let user_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::User(user_id)).await?;

        let removed = tx
            .delete_cart_entries(CartSelector::Entry { user_id, entry_id })
            .await?;
        if removed == 0 {
            return Err(MarketError::NotFound);
        }
        tx.commit().await?;

        info!("removed from cart");
        Ok(())
    }

    /// Cart entries, oldest first, joined with current product data.
    #[instrument(skip(self, actor), fields(user_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn list_cart(&self, actor: &ActorContext) -> MarketResult<Vec<CartLine>> {
        let user_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::Unscoped).await?;
        Ok(load_cart_lines(tx.as_mut(), user_id).await?)
    }

    #[instrument(skip(self, actor), fields(user_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn cart_count(&self, actor: &ActorContext) -> MarketResult<usize> {
        let user_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::Unscoped).await?;
        Ok(tx.select_cart_entries(user_id).await?.len())
    }

    #[instrument(skip(self, actor), fields(user_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn cart_summary(&self, actor: &ActorContext) -> MarketResult<CartOverview> {
        let lines = self.list_cart(actor).await?;
        let estimated_co2_kg = self
            .estimator
            .estimate_total(lines.iter().map(|l| l.price().amount()));
        Ok(CartOverview {
            summary: CartSummary::from_lines(&lines)?,
            estimated_co2_kg,
        })
    }
}
