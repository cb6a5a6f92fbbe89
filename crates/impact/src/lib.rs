//! Environmental-impact estimate shown next to carts and purchases.

pub mod estimator;

pub use estimator::{
    FixedJitter, ImpactEstimator, JITTER_MAX, Jitter, RandomJitter, SeededJitter,
};
