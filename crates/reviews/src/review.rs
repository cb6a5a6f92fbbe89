use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ecofinds_core::{DomainError, DomainResult, Entity, ProductId, ReviewId, UserId, ValueObject};
use ecofinds_purchasing::Purchase;

/// Star rating, 1 to 5 inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> DomainResult<Self> {
        if !(i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            return Err(DomainError::InvalidRating(value));
        }
        Ok(Self(value as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl ValueObject for Rating {}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

/// A buyer's rating of a seller for one purchased product.
///
/// Unique per `(buyer_id, seller_id, product_id)`; also a storage-level constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Review request as submitted from the purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub rating: i64,
    pub comment: String,
}

impl Review {
    /// Validate and build a review by `buyer_id`.
    ///
    /// - `purchases`: the buyer's purchases of `request.product_id`; at least one
    ///   must be from `request.seller_id`.
    /// - `existing`: reviews already stored for the same triple (early duplicate
    ///   check; the store constraint closes the race).
    pub fn submit(
        id: ReviewId,
        buyer_id: UserId,
        request: NewReview,
        purchases: &[Purchase],
        existing: &[Review],
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let rating = Rating::new(request.rating)?;

        ensure_eligible(buyer_id, request.seller_id, request.product_id, purchases)?;

        if existing.iter().any(|r| {
            r.buyer_id == buyer_id
                && r.seller_id == request.seller_id
                && r.product_id == request.product_id
        }) {
            return Err(DomainError::DuplicateReview);
        }

        Ok(Self {
            id,
            buyer_id,
            seller_id: request.seller_id,
            product_id: request.product_id,
            rating,
            comment: request.comment.trim().to_string(),
            created_at,
        })
    }
}

/// A buyer may rate a seller for a product only after buying it from them.
pub fn ensure_eligible(
    buyer_id: UserId,
    seller_id: UserId,
    product_id: ProductId,
    purchases: &[Purchase],
) -> DomainResult<()> {
    let bought = purchases.iter().any(|p| {
        p.buyer_id == buyer_id && p.seller_id == seller_id && p.product_id == product_id
    });
    if !bought {
        return Err(DomainError::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ecofinds_core::PurchaseId;

    use super::*;

    fn purchase(buyer: UserId, seller: UserId, product: ProductId) -> Purchase {
        Purchase {
            id: PurchaseId::new(),
            buyer_id: buyer,
            product_id: product,
            seller_id: seller,
            purchased_at: Utc::now(),
        }
    }

    fn request(seller: UserId, product: ProductId, rating: i64) -> NewReview {
        NewReview {
            seller_id: seller,
            product_id: product,
            rating,
            comment: " great seller ".to_string(),
        }
    }

    #[test]
    fn rating_bounds() {
        assert_eq!(Rating::new(0), Err(DomainError::InvalidRating(0)));
        assert_eq!(Rating::new(6), Err(DomainError::InvalidRating(6)));
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().value(), 5);
    }

    #[test]
    fn submit_after_purchase() {
        let (buyer, seller, product) = (UserId::new(), UserId::new(), ProductId::new());
        let purchases = vec![purchase(buyer, seller, product)];

        let review = Review::submit(
            ReviewId::new(),
            buyer,
            request(seller, product, 5),
            &purchases,
            &[],
            Utc::now(),
        )
        .unwrap();

        assert_eq!(review.rating.value(), 5);
        assert_eq!(review.comment, "great seller");
    }

    #[test]
    fn submit_without_purchase_is_unauthorized() {
        let (buyer, seller, product) = (UserId::new(), UserId::new(), ProductId::new());
        let err = Review::submit(
            ReviewId::new(),
            buyer,
            request(seller, product, 4),
            &[],
            &[],
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
    }

    #[test]
    fn submit_naming_the_wrong_seller_is_unauthorized() {
        let (buyer, seller, product) = (UserId::new(), UserId::new(), ProductId::new());
        let purchases = vec![purchase(buyer, seller, product)];
        let err = Review::submit(
            ReviewId::new(),
            buyer,
            request(UserId::new(), product, 4),
            &purchases,
            &[],
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
    }

    #[test]
    fn invalid_rating_is_reported_before_eligibility() {
        let err = Review::submit(
            ReviewId::new(),
            UserId::new(),
            request(UserId::new(), ProductId::new(), 9),
            &[],
            &[],
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::InvalidRating(9));
    }

    #[test]
    fn second_review_for_same_triple_is_duplicate() {
        let (buyer, seller, product) = (UserId::new(), UserId::new(), ProductId::new());
        let purchases = vec![purchase(buyer, seller, product)];
        let first = Review::submit(
            ReviewId::new(),
            buyer,
            request(seller, product, 5),
            &purchases,
            &[],
            Utc::now(),
        )
        .unwrap();

        let err = Review::submit(
            ReviewId::new(),
            buyer,
            request(seller, product, 1),
            &purchases,
            &[first],
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::DuplicateReview);
    }
}
