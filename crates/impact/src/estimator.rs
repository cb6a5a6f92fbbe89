use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Upper bound (exclusive) of the per-call jitter.
pub const JITTER_MAX: f64 = 2.0;

/// Source of the uniform `[0, 2)` jitter added to each estimate.
pub trait Jitter: Send + Sync + core::fmt::Debug {
    fn sample(&self) -> f64;
}

/// Fresh thread-local randomness on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn sample(&self) -> f64 {
        rand::rng().random_range(0.0..JITTER_MAX)
    }
}

/// Reproducible sequence from a fixed seed.
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn sample(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.random_range(0.0..JITTER_MAX),
            Err(poisoned) => poisoned.into_inner().random_range(0.0..JITTER_MAX),
        }
    }
}

/// Constant jitter, clamped into `[0, 2)`.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(f64);

impl FixedJitter {
    pub fn new(value: f64) -> Self {
        let value = if value.is_finite() { value } else { 0.0 };
        Self(value.clamp(0.0, JITTER_MAX - f64::EPSILON))
    }
}

impl Jitter for FixedJitter {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Estimated kilograms of CO₂ avoided by buying second-hand.
///
/// `floor(price * 0.1 + U)`, `U` uniform in `[0, 2)` and drawn per call, with a
/// floor of 1 kg. This is display text, not a ledger value: the same purchase
/// yields different figures on different calls, and a total is the sum of
/// independent per-item draws. Never persist the result.
#[derive(Debug, Clone)]
pub struct ImpactEstimator {
    jitter: Arc<dyn Jitter>,
}

impl Default for ImpactEstimator {
    fn default() -> Self {
        Self::new(Arc::new(RandomJitter))
    }
}

impl ImpactEstimator {
    pub fn new(jitter: Arc<dyn Jitter>) -> Self {
        Self { jitter }
    }

    /// Deterministic estimator, for tests and reproducible reports.
    pub fn fixed(jitter: f64) -> Self {
        Self::new(Arc::new(FixedJitter::new(jitter)))
    }

    /// Estimate for one item priced `price` (negative prices count as zero).
    pub fn estimate(&self, price: Decimal) -> u64 {
        let price = price.max(Decimal::ZERO);
        let u = Decimal::from_f64(self.jitter.sample()).unwrap_or(Decimal::ZERO);
        price
            .checked_mul(Decimal::new(1, 1))
            .and_then(|kg| kg.checked_add(u))
            .and_then(|kg| kg.floor().to_u64())
            .unwrap_or(u64::MAX)
            .max(1)
    }

    /// Sum of independent per-item estimates.
    pub fn estimate_total(&self, prices: impl IntoIterator<Item = Decimal>) -> u64 {
        prices
            .into_iter()
            .map(|p| self.estimate(p))
            .fold(0u64, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifty_with_no_jitter_is_five_kg() {
        let est = ImpactEstimator::fixed(0.0);
        assert_eq!(est.estimate(Decimal::new(50, 0)), 5);
    }

    #[test]
    fn jitter_can_add_one_kg() {
        let est = ImpactEstimator::fixed(1.5);
        assert_eq!(est.estimate(Decimal::new(50, 0)), 6);
    }

    #[test]
    fn cheap_items_still_count_one_kg() {
        let est = ImpactEstimator::fixed(0.0);
        assert_eq!(est.estimate(Decimal::ZERO), 1);
        assert_eq!(est.estimate(Decimal::new(5, 0)), 1);
    }

    #[test]
    fn fractional_prices_are_floored() {
        let est = ImpactEstimator::fixed(0.25);
        // 129.99 * 0.1 + 0.25 = 13.249
        assert_eq!(est.estimate(Decimal::new(12999, 2)), 13);
    }

    #[test]
    fn total_sums_per_item_estimates() {
        let est = ImpactEstimator::fixed(0.0);
        let prices = [Decimal::new(50, 0), Decimal::new(100, 0), Decimal::ONE];
        assert_eq!(est.estimate_total(prices), 5 + 10 + 1);
        assert_eq!(est.estimate_total(Vec::<Decimal>::new()), 0);
    }

    #[test]
    fn fixed_jitter_is_clamped() {
        assert_eq!(FixedJitter::new(-3.0).sample(), 0.0);
        assert!(FixedJitter::new(9.0).sample() < JITTER_MAX);
        assert_eq!(FixedJitter::new(f64::NAN).sample(), 0.0);
    }

    #[test]
    fn random_estimates_stay_within_band() {
        let est = ImpactEstimator::default();
        for _ in 0..200 {
            let kg = est.estimate(Decimal::new(50, 0));
            assert!((5..=6).contains(&kg), "got {kg}");
        }
    }

    #[test]
    fn seeded_jitter_is_reproducible() {
        let a = SeededJitter::new(42);
        let b = SeededJitter::new(42);
        for _ in 0..10 {
            let (x, y) = (a.sample(), b.sample());
            assert_eq!(x, y);
            assert!((0.0..JITTER_MAX).contains(&x));
        }
    }
}
