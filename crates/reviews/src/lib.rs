//! Reviews domain module.
//!
//! Buyer-to-seller ratings recorded after a purchase, and the seller reputation
//! (average rating, badge) derived from them.

pub mod rating;
pub mod review;

pub use rating::{Achievement, SellerBadge, SellerRating};
pub use review::{NewReview, Rating, Review, ensure_eligible};
