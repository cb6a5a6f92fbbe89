use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ecofinds_core::{DomainError, DomainResult, Entity, ProductId, UserId, ValueObject};

/// Listing price: a non-negative decimal amount in the marketplace currency.
///
/// Amounts carry at most two decimal places. A single listing is capped at
/// [`Price::MAX`], the largest value the `NUMERIC(12, 2)` column holds; totals
/// built with [`Price::total`] may exceed it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    /// 9 999 999 999.99
    pub const MAX: Price = Price(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    const SCALE: u32 = 2;

    /// Validate a listing price.
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        let price = Self::amount_checked(amount)?;
        if price > Self::MAX {
            return Err(DomainError::validation(format!(
                "price cannot exceed {}",
                Self::MAX
            )));
        }
        Ok(price)
    }

    fn amount_checked(amount: Decimal) -> DomainResult<Self> {
        if amount < Decimal::ZERO {
            return Err(DomainError::validation("price cannot be negative"));
        }
        if amount.normalize().scale() > Self::SCALE {
            return Err(DomainError::validation(
                "price cannot have more than two decimal places",
            ));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn checked_add(self, rhs: Price) -> Option<Price> {
        self.0.checked_add(rhs.0).map(Price)
    }

    /// Sum of `prices`, or a validation error if the total overflows.
    pub fn total(prices: impl IntoIterator<Item = Price>) -> DomainResult<Price> {
        prices.into_iter().try_fold(Price::ZERO, |acc, price| {
            acc.checked_add(price)
                .ok_or_else(|| DomainError::validation("price total overflowed"))
        })
    }
}

impl ValueObject for Price {}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    /// Accepts totals above [`Price::MAX`]; listings go through [`Price::new`].
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::amount_checked(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A second-hand item listed by its seller.
///
/// The seller (`owner_id`) is fixed at creation; listings are never transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Product {
    /// Validate a listing request and build the product owned by `owner_id`.
    pub fn list(
        id: ProductId,
        owner_id: UserId,
        listing: NewListing,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let title = listing.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        let category = listing.category.trim();
        if category.is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }

        let price = Price::new(listing.price)?;

        let image_url = listing
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            id,
            owner_id,
            title: title.to_string(),
            description: listing.description.trim().to_string(),
            category: category.to_string(),
            price,
            image_url,
            created_at,
        })
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }
}

/// Listing request submitted by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub image_url: Option<String>,
}
