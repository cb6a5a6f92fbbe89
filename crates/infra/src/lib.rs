//! Infrastructure layer: storage adapters, configuration and the marketplace
//! services built on them.

pub mod config;
pub mod error;
pub mod services;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use error::{MarketError, MarketResult};
pub use services::Marketplace;
pub use store::{InMemoryMarketStore, MarketStore, PgMarketStore};
