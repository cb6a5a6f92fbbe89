//! Marketplace services.
//!
//! Each service owns a handle to the store and runs every operation as one
//! store transaction. The acting user comes in as an explicit `ActorContext`.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod profile;
pub mod purchases;
mod query;
pub mod reviews;

pub use cart::{CartOverview, CartStore};
pub use catalog::CatalogService;
pub use checkout::{CheckoutEngine, CheckoutResult};
pub use profile::{ProfileService, ProfileStats};
pub use purchases::{HistoryLine, PurchaseHistory, PurchaseLedger};
pub use reviews::ReviewService;

use ecofinds_impact::ImpactEstimator;

use crate::store::MarketStore;

/// All services wired to one store and one impact estimator.
#[derive(Debug, Clone)]
pub struct Marketplace<S> {
    pub catalog: CatalogService<S>,
    pub cart: CartStore<S>,
    pub checkout: CheckoutEngine<S>,
    pub purchases: PurchaseLedger<S>,
    pub reviews: ReviewService<S>,
    pub profile: ProfileService<S>,
}

impl<S: MarketStore + Clone> Marketplace<S> {
    pub fn new(store: S, estimator: ImpactEstimator) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            cart: CartStore::new(store.clone(), estimator.clone()),
            checkout: CheckoutEngine::new(store.clone(), estimator.clone()),
            purchases: PurchaseLedger::new(store.clone(), estimator.clone()),
            reviews: ReviewService::new(store.clone()),
            profile: ProfileService::new(store, estimator),
        }
    }
}
