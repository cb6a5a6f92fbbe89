//! Checkout engine.
//!
//! A checkout runs as one transaction holding the buyer's partition lock:
//!
//! 1. snapshot the cart (entries joined with current products);
//! 2. plan one purchase per entry;
//! 3. insert every purchase;
//! 4. delete every cart entry of the buyer;
//! 5. commit.
//!
//! Any store failure between `begin` and `commit` drops the transaction, which
//! rolls back every write, and is reported as `CheckoutFailed`. The observable
//! outcome is either the whole cart converted or nothing at all.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use ecofinds_catalog::Price;
use ecofinds_core::{ActorContext, PurchaseId};
use ecofinds_impact::ImpactEstimator;
use ecofinds_purchasing::{CheckoutPlan, Purchase};

use super::query::load_cart_lines;
use crate::error::{MarketError, MarketResult};
use crate::store::{CartSelector, LockScope, MarketStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    /// Created purchases, in cart order. Empty when the cart was empty.
    pub purchases: Vec<Purchase>,
    pub total_price: Price,
    /// Sum of independent per-item estimates; display only.
    pub estimated_co2_kg: u64,
}

impl CheckoutResult {
    fn empty() -> Self {
        Self {
            purchases: Vec::new(),
            total_price: Price::ZERO,
            estimated_co2_kg: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutEngine<S> {
    store: S,
    estimator: ImpactEstimator,
}

impl<S: MarketStore> CheckoutEngine<S> {
    pub fn new(store: S, estimator: ImpactEstimator) -> Self {
        Self { store, estimator }
    }

    /// Convert the acting user's whole cart into purchases.
    ///
    /// An empty cart is a successful no-op.
    #[instrument(skip(self, actor), fields(buyer_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn checkout(&self, actor: &ActorContext) -> MarketResult<CheckoutResult> {
        let buyer_id = actor.require_user()?;
        let mut tx = self
            .store
            .begin(LockScope::User(buyer_id))
            .await
            .map_err(failed)?;

        let lines = load_cart_lines(tx.as_mut(), buyer_id)
            .await
            .map_err(failed)?;
        if lines.is_empty() {
            return Ok(CheckoutResult::empty());
        }

        let plan = CheckoutPlan::from_snapshot(buyer_id, &lines, Utc::now(), PurchaseId::new)?;

        for purchase in &plan.purchases {
            tx.insert_purchase(purchase).await.map_err(failed)?;
        }

        let cleared = tx
            .delete_cart_entries(CartSelector::User(buyer_id))
            .await
            .map_err(failed)?;
        if cleared != plan.consumed_entries.len() as u64 {
            warn!(
                expected = plan.consumed_entries.len(),
                cleared, "cart changed during checkout"
            );
            return Err(MarketError::CheckoutFailed(format!(
                "expected to clear {} cart entries, cleared {cleared}",
                plan.consumed_entries.len()
            )));
        }

        tx.commit().await.map_err(failed)?;

        let estimated_co2_kg = self
            .estimator
            .estimate_total(lines.iter().map(|l| l.price().amount()));

        info!(
            purchases = plan.len(),
            total_price = %plan.total_price,
            "checkout committed"
        );

        Ok(CheckoutResult {
            purchases: plan.purchases,
            total_price: plan.total_price,
            estimated_co2_kg,
        })
    }
}

fn failed(err: StoreError) -> MarketError {
    MarketError::CheckoutFailed(err.to_string())
}
