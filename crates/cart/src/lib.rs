//! Cart domain module.
//!
//! Per-user holding area of products not yet purchased: entry construction,
//! self-purchase and duplicate rules, and read-time cart lines.

pub mod entry;

pub use entry::{CartEntry, CartLine, CartSummary, ensure_can_add, sort_by_added};
