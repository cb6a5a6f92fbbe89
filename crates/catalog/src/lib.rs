//! Product catalog module.
//!
//! Listings as seen by the cart, checkout and review rules: pure types and
//! validation, no IO.

pub mod feed;
pub mod product;

pub use feed::{FeedQuery, sort_newest_first};
pub use product::{NewListing, Price, Product};
