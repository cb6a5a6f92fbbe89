use thiserror::Error;

use ecofinds_core::DomainError;

use crate::store::{Constraint, StoreError};

/// Error returned by the marketplace services.
///
/// Domain failures pass through under their own kinds. Store uniqueness
/// violations are mapped back onto the duplicate kind they stand for, so a
/// caller cannot tell whether the early domain check or the storage constraint
/// caught a duplicate. A foreign key violation means another transaction
/// changed the referenced listing first and surfaces as `Conflict`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not found")]
    NotFound,

    #[error("cannot add your own product to the cart")]
    SelfPurchaseForbidden,

    #[error("product is already in the cart")]
    DuplicateEntry,

    #[error("seller already reviewed for this product")]
    DuplicateReview,

    #[error("invalid rating: {0} (expected 1..=5)")]
    InvalidRating(i64),

    /// The checkout transaction was rolled back; cart and ledger are unchanged.
    #[error("checkout failed: {0}")]
    CheckoutFailed(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Store(StoreError),
}

pub type MarketResult<T> = Result<T, MarketError>;

impl From<DomainError> for MarketError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Unauthenticated => MarketError::Unauthenticated,
            DomainError::NotFound => MarketError::NotFound,
            DomainError::SelfPurchaseForbidden => MarketError::SelfPurchaseForbidden,
            DomainError::DuplicateEntry => MarketError::DuplicateEntry,
            DomainError::DuplicateReview => MarketError::DuplicateReview,
            DomainError::InvalidRating(value) => MarketError::InvalidRating(value),
            DomainError::Validation(msg) => MarketError::Validation(msg),
            DomainError::Conflict(msg) => MarketError::Conflict(msg),
            DomainError::Unauthorized => MarketError::Unauthorized,
            DomainError::InvalidId(msg) => MarketError::Validation(msg),
        }
    }
}

impl From<StoreError> for MarketError {
    fn from(value: StoreError) -> Self {
        match &value {
            StoreError::UniqueViolation(Constraint::CartEntry) => MarketError::DuplicateEntry,
            StoreError::UniqueViolation(Constraint::Review) => MarketError::DuplicateReview,
            StoreError::ForeignKeyViolation(_) => MarketError::Conflict(value.to_string()),
            _ => MarketError::Store(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_become_duplicates() {
        assert_eq!(
            MarketError::from(StoreError::UniqueViolation(Constraint::CartEntry)),
            MarketError::DuplicateEntry
        );
        assert_eq!(
            MarketError::from(StoreError::UniqueViolation(Constraint::Review)),
            MarketError::DuplicateReview
        );
        assert!(matches!(
            MarketError::from(StoreError::UniqueViolation(Constraint::Other("x".into()))),
            MarketError::Store(_)
        ));
    }

    #[test]
    fn foreign_key_violations_become_conflicts() {
        let err = MarketError::from(StoreError::ForeignKeyViolation(
            "purchases_product_id_fkey".to_string(),
        ));
        assert_eq!(
            err,
            MarketError::Conflict("foreign key violated: purchases_product_id_fkey".to_string())
        );
    }

    #[test]
    fn domain_kinds_pass_through() {
        assert_eq!(
            MarketError::from(DomainError::InvalidRating(7)),
            MarketError::InvalidRating(7)
        );
        assert_eq!(
            MarketError::from(DomainError::invalid_id("nope")),
            MarketError::Validation("nope".to_string())
        );
    }
}
