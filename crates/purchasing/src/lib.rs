//! Purchasing domain module.
//!
//! The purchase ledger's row type, ledger statistics, and the pure checkout plan
//! that converts a cart snapshot into purchase records.

pub mod checkout;
pub mod purchase;

pub use checkout::CheckoutPlan;
pub use purchase::{
    Purchase, PurchaseLine, sort_newest_first, total_purchases, total_sales,
};
