//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Storage failures belong to the infra layer, which maps
/// constraint violations back onto the matching variants here.
///
/// Every variant is a recoverable, user-facing condition: the caller reports it
/// and prior state is left unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No acting user was supplied for an operation that requires one.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The referenced entity does not exist, or is not visible to the caller.
    #[error("not found")]
    NotFound,

    /// A seller tried to put their own listing into their cart.
    #[error("cannot add your own product to the cart")]
    SelfPurchaseForbidden,

    /// The product is already in the user's cart.
    #[error("product is already in the cart")]
    DuplicateEntry,

    /// The buyer already reviewed this seller for this product.
    #[error("seller already reviewed for this product")]
    DuplicateReview,

    /// A rating outside `1..=5`.
    #[error("invalid rating: {0} (expected 1..=5)")]
    InvalidRating(i64),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The acting user may not perform this action.
    #[error("unauthorized")]
    Unauthorized,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rating_message_names_the_value() {
        let err = DomainError::InvalidRating(7);
        assert_eq!(err.to_string(), "invalid rating: 7 (expected 1..=5)");
    }

    #[test]
    fn helpers_build_expected_variants() {
        assert_eq!(
            DomainError::validation("title"),
            DomainError::Validation("title".to_string())
        );
        assert_eq!(
            DomainError::conflict("sold"),
            DomainError::Conflict("sold".to_string())
        );
    }
}
