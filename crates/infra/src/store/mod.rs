//! Transactional marketplace storage boundary.
//!
//! Services talk to storage only through `MarketStore`/`StoreTx`. Both adapters
//! enforce the uniqueness constraints themselves and commit all-or-nothing.

mod r#trait;

pub mod in_memory;
pub mod postgres;

pub use in_memory::{FaultPoint, InMemoryMarketStore};
pub use postgres::PgMarketStore;
pub use r#trait::{
    CartSelector, Constraint, LockScope, MarketStore, PurchaseFilter, ReviewFilter, StoreError,
    StoreTx,
};
