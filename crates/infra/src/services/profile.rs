use serde::{Deserialize, Serialize};
use tracing::instrument;

use ecofinds_core::{ActorContext, UserId};
use ecofinds_impact::ImpactEstimator;
use ecofinds_purchasing::{total_purchases, total_sales};
use ecofinds_reviews::{Achievement, SellerBadge, SellerRating};

use super::query::load_purchase_lines;
use crate::error::MarketResult;
use crate::store::{LockScope, MarketStore, PurchaseFilter, ReviewFilter};

/// Dashboard figures for one user, derived on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub user_id: UserId,
    /// Purchases of listings this user sells.
    pub total_sales: usize,
    /// Purchases this user made.
    pub total_purchases: usize,
    pub rating: SellerRating,
    /// Estimated CO₂ saved across this user's purchases.
    pub estimated_co2_kg: u64,
    pub badge: Option<SellerBadge>,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone)]
pub struct ProfileService<S> {
    store: S,
    estimator: ImpactEstimator,
}

impl<S: MarketStore> ProfileService<S> {
    pub fn new(store: S, estimator: ImpactEstimator) -> Self {
        Self { store, estimator }
    }

    #[instrument(skip(self, actor), fields(user_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn profile_stats(&self, actor: &ActorContext) -> MarketResult<ProfileStats> {
        let user_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::Unscoped).await?;

        let sold = tx.select_purchases(PurchaseFilter::Seller(user_id)).await?;
        let bought = tx.select_purchases(PurchaseFilter::Buyer(user_id)).await?;
        let reviews = tx.select_reviews(ReviewFilter::Seller(user_id)).await?;

        let total_sales = total_sales(&sold, user_id);
        let total_purchases = total_purchases(&bought, user_id);
        let rating = SellerRating::for_seller(user_id, &reviews);

        let bought = load_purchase_lines(tx.as_mut(), bought).await?;
        let estimated_co2_kg = self
            .estimator
            .estimate_total(bought.iter().map(|l| l.product.price.amount()));

        Ok(ProfileStats {
            user_id,
            total_sales,
            total_purchases,
            rating,
            estimated_co2_kg,
            badge: SellerBadge::derive(rating.average, total_sales),
            achievements: Achievement::earned(total_purchases, total_sales, estimated_co2_kg),
        })
    }
}
