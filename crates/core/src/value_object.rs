//! Value object trait: equality by value, not identity.
//!
//! Value objects have no identity; they are defined entirely by their attribute
//! values. `Price` and `Rating` are the marketplace's value objects: a rating of
//! 4 is the same rating wherever it appears.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// construct a new one; constructors are where validation lives, so a value that
/// exists is a value that is valid.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct Rating(u8);
///
/// impl ValueObject for Rating {}
///
/// assert_eq!(Rating(4), Rating(4));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
