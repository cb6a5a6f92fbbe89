use serde::{Deserialize, Serialize};
use tracing::instrument;

use ecofinds_catalog::Price;
use ecofinds_core::ActorContext;
use ecofinds_impact::ImpactEstimator;
use ecofinds_purchasing::PurchaseLine;

use super::query::load_purchase_lines;
use crate::error::MarketResult;
use crate::store::{LockScope, MarketStore, PurchaseFilter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLine {
    #[serde(flatten)]
    pub line: PurchaseLine,
    pub estimated_co2_kg: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseHistory {
    /// Newest purchase first.
    pub lines: Vec<HistoryLine>,
    /// Current price of every purchased product, summed.
    pub total_price: Price,
    /// Sum of the per-line estimates above.
    pub estimated_co2_kg: u64,
}

/// Read side of the append-only purchase ledger.
#[derive(Debug, Clone)]
pub struct PurchaseLedger<S> {
    store: S,
    estimator: ImpactEstimator,
}

impl<S: MarketStore> PurchaseLedger<S> {
    pub fn new(store: S, estimator: ImpactEstimator) -> Self {
        Self { store, estimator }
    }

    #[instrument(skip(self, actor), fields(buyer_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn purchase_history(&self, actor: &ActorContext) -> MarketResult<PurchaseHistory> {
        let buyer_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::Unscoped).await?;

        let purchases = tx.select_purchases(PurchaseFilter::Buyer(buyer_id)).await?;
        let lines = load_purchase_lines(tx.as_mut(), purchases).await?;

        let lines: Vec<HistoryLine> = lines
            .into_iter()
            .map(|line| HistoryLine {
                estimated_co2_kg: self.estimator.estimate(line.product.price.amount()),
                line,
            })
            .collect();

        Ok(PurchaseHistory {
            total_price: Price::total(lines.iter().map(|l| l.line.product.price))?,
            estimated_co2_kg: lines
                .iter()
                .map(|l| l.estimated_co2_kg)
                .fold(0u64, u64::saturating_add),
            lines,
        })
    }
}
