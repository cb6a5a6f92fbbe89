//! Seller reputation: rating aggregate, badge and profile achievements.
//!
//! Both are derived on read from the authoritative review and purchase rows.
//! Nothing here is persisted.

use serde::{Deserialize, Serialize};

use ecofinds_core::UserId;

use crate::review::Review;

/// Average rating and review count for one seller.
///
/// With no reviews the average is `0.0`; callers must read that as "not rated
/// yet", never as "lowest rating". Use [`SellerRating::is_rated`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerRating {
    pub average: f64,
    pub count: u32,
}

impl SellerRating {
    pub const UNRATED: SellerRating = SellerRating {
        average: 0.0,
        count: 0,
    };

    /// Aggregate the reviews addressed to `seller_id`; others are ignored.
    pub fn for_seller<'a>(seller_id: UserId, reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let (sum, count) = reviews
            .into_iter()
            .filter(|r| r.seller_id == seller_id)
            .fold((0u64, 0u32), |(sum, count), r| {
                (sum + u64::from(r.rating.value()), count + 1)
            });

        if count == 0 {
            return Self::UNRATED;
        }

        Self {
            average: sum as f64 / f64::from(count),
            count,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.count > 0
    }
}

/// Seller badge, from best to most basic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerBadge {
    EcoChampion,
    GreenSeller,
    EcoStarter,
}

impl SellerBadge {
    /// Evaluated top-down, first match wins.
    pub fn derive(avg_rating: f64, total_sales: usize) -> Option<Self> {
        if avg_rating >= 4.5 && total_sales >= 5 {
            Some(Self::EcoChampion)
        } else if avg_rating >= 4.0 && total_sales >= 3 {
            Some(Self::GreenSeller)
        } else if total_sales >= 1 {
            Some(Self::EcoStarter)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::EcoChampion => "Eco Champion",
            Self::GreenSeller => "Green Seller",
            Self::EcoStarter => "Eco Starter",
        }
    }
}

impl core::fmt::Display for SellerBadge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Profile milestones, shown in this order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    /// At least one purchase made.
    EcoShopper,
    /// At least one listing sold.
    SustainabilityAdvocate,
    /// At least [`Achievement::PLANET_PROTECTOR_KG`] of estimated CO₂ saved.
    PlanetProtector,
}

impl Achievement {
    pub const PLANET_PROTECTOR_KG: u64 = 10;

    pub fn earned(total_purchases: usize, total_sales: usize, co2_saved_kg: u64) -> Vec<Self> {
        let mut earned = Vec::new();
        if total_purchases > 0 {
            earned.push(Self::EcoShopper);
        }
        if total_sales > 0 {
            earned.push(Self::SustainabilityAdvocate);
        }
        if co2_saved_kg >= Self::PLANET_PROTECTOR_KG {
            earned.push(Self::PlanetProtector);
        }
        earned
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::EcoShopper => "Eco Shopper",
            Self::SustainabilityAdvocate => "Sustainability Advocate",
            Self::PlanetProtector => "Planet Protector",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::EcoShopper => "Made your first sustainable purchase",
            Self::SustainabilityAdvocate => "Started selling sustainable products",
            Self::PlanetProtector => "Saved 10kg+ of CO₂ emissions",
        }
    }
}

impl core::fmt::Display for Achievement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use ecofinds_core::{ProductId, ReviewId};

    use super::*;
    use crate::review::Rating;

    fn review(seller: UserId, rating: i64) -> Review {
        Review {
            id: ReviewId::new(),
            buyer_id: UserId::new(),
            seller_id: seller,
            product_id: ProductId::new(),
            rating: Rating::new(rating).unwrap(),
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_reviews_is_unrated_zero() {
        let rating = SellerRating::for_seller(UserId::new(), &[]);
        assert_eq!(rating, SellerRating { average: 0.0, count: 0 });
        assert!(!rating.is_rated());
    }

    #[test]
    fn averages_five_three_four_to_four() {
        let seller = UserId::new();
        let reviews = vec![review(seller, 5), review(seller, 3), review(seller, 4)];
        let rating = SellerRating::for_seller(seller, &reviews);
        assert_eq!(rating, SellerRating { average: 4.0, count: 3 });
    }

    #[test]
    fn ignores_reviews_of_other_sellers() {
        let seller = UserId::new();
        let reviews = vec![review(seller, 2), review(UserId::new(), 5)];
        let rating = SellerRating::for_seller(seller, &reviews);
        assert_eq!(rating, SellerRating { average: 2.0, count: 1 });
    }

    #[test]
    fn badge_thresholds() {
        assert_eq!(SellerBadge::derive(4.5, 5), Some(SellerBadge::EcoChampion));
        assert_eq!(SellerBadge::derive(4.9, 4), Some(SellerBadge::GreenSeller));
        assert_eq!(SellerBadge::derive(4.0, 3), Some(SellerBadge::GreenSeller));
        assert_eq!(SellerBadge::derive(3.9, 10), Some(SellerBadge::EcoStarter));
        assert_eq!(SellerBadge::derive(0.0, 1), Some(SellerBadge::EcoStarter));
        assert_eq!(SellerBadge::derive(5.0, 0), None);
    }

    #[test]
    fn badge_labels() {
        assert_eq!(SellerBadge::EcoChampion.to_string(), "Eco Champion");
        assert_eq!(SellerBadge::GreenSeller.label(), "Green Seller");
        assert_eq!(SellerBadge::EcoStarter.label(), "Eco Starter");
    }

    #[test]
    fn achievement_thresholds() {
        assert!(Achievement::earned(0, 0, 9).is_empty());
        assert_eq!(Achievement::earned(1, 0, 0), vec![Achievement::EcoShopper]);
        assert_eq!(
            Achievement::earned(0, 1, 0),
            vec![Achievement::SustainabilityAdvocate]
        );
        assert_eq!(Achievement::earned(0, 0, 10), vec![Achievement::PlanetProtector]);
        assert_eq!(
            Achievement::earned(2, 3, 42),
            vec![
                Achievement::EcoShopper,
                Achievement::SustainabilityAdvocate,
                Achievement::PlanetProtector,
            ]
        );
    }

    #[test]
    fn achievement_labels() {
        assert_eq!(Achievement::EcoShopper.to_string(), "Eco Shopper");
        assert_eq!(
            Achievement::SustainabilityAdvocate.label(),
            "Sustainability Advocate"
        );
        assert_eq!(
            Achievement::PlanetProtector.description(),
            "Saved 10kg+ of CO₂ emissions"
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the average always lies within the rating scale and the
            /// count equals the number of reviews for that seller.
            #[test]
            fn average_stays_in_scale(ratings in proptest::collection::vec(1i64..=5, 1..50)) {
                let seller = UserId::new();
                let reviews: Vec<Review> = ratings.iter().map(|r| review(seller, *r)).collect();
                let agg = SellerRating::for_seller(seller, &reviews);

                prop_assert_eq!(agg.count as usize, ratings.len());
                prop_assert!(agg.average >= 1.0 && agg.average <= 5.0);
                let expected = ratings.iter().sum::<i64>() as f64 / ratings.len() as f64;
                prop_assert!((agg.average - expected).abs() < 1e-9);
            }

            /// Property: no sales means no badge, any sale means some badge.
            #[test]
            fn badge_requires_a_sale(avg in 0.0f64..=5.0, sales in 0usize..20) {
                prop_assert_eq!(SellerBadge::derive(avg, sales).is_some(), sales >= 1);
            }
        }
    }
}
