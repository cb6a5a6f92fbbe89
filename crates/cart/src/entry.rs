use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ecofinds_catalog::{Price, Product};
use ecofinds_core::{CartEntryId, DomainError, DomainResult, Entity, ProductId, UserId};

/// A product waiting in a user's cart.
///
/// Invariants (the second one is also a storage-level constraint):
/// - `user_id` is never the product's owner;
/// - at most one entry per `(user_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub id: CartEntryId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
}

impl Entity for CartEntry {
    type Id = CartEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl CartEntry {
    /// Build a new entry after checking that `user_id` may buy `product`.
    ///
    /// `existing` is the user's current cart; it is used for an early duplicate
    /// check only. The store's uniqueness constraint is what closes the race.
    pub fn add(
        id: CartEntryId,
        user_id: UserId,
        product: &Product,
        existing: &[CartEntry],
        added_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_can_add(user_id, product)?;

        if existing
            .iter()
            .any(|e| e.user_id == user_id && e.product_id == product.id)
        {
            return Err(DomainError::DuplicateEntry);
        }

        Ok(Self {
            id,
            user_id,
            product_id: product.id,
            added_at,
        })
    }
}

/// Sellers may not put their own listings in their cart.
pub fn ensure_can_add(user_id: UserId, product: &Product) -> DomainResult<()> {
    if product.is_owned_by(user_id) {
        return Err(DomainError::SelfPurchaseForbidden);
    }
    Ok(())
}

/// Cart ordering: oldest entry first, ties broken by id.
pub fn sort_by_added(entries: &mut [CartEntry]) {
    entries.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.id.cmp(&b.id)));
}

/// A cart entry joined with the product as it is *now*.
///
/// Prices are read at display/checkout time, never frozen when the item was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub entry: CartEntry,
    pub product: Product,
}

impl CartLine {
    pub fn price(&self) -> Price {
        self.product.price
    }
}

/// Aggregate figures for a cart, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    pub item_count: usize,
    pub total_price: Price,
}

impl CartSummary {
    pub fn from_lines(lines: &[CartLine]) -> DomainResult<Self> {
        Ok(Self {
            item_count: lines.len(),
            total_price: Price::total(lines.iter().map(CartLine::price))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use ecofinds_catalog::NewListing;

    use super::*;

    fn product_owned_by(owner: UserId, price: Decimal) -> Product {
        Product::list(
            ProductId::new(),
            owner,
            NewListing {
                title: "Bike".to_string(),
                description: String::new(),
                category: "Sports".to_string(),
                price,
                image_url: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn add_creates_entry_for_buyer() {
        let buyer = UserId::new();
        let product = product_owned_by(UserId::new(), Decimal::new(50, 0));
        let entry = CartEntry::add(CartEntryId::new(), buyer, &product, &[], Utc::now()).unwrap();
        assert_eq!(entry.user_id, buyer);
        assert_eq!(entry.product_id, product.id);
    }

    #[test]
    fn add_rejects_own_product() {
        let seller = UserId::new();
        let product = product_owned_by(seller, Decimal::ONE);
        let err = CartEntry::add(CartEntryId::new(), seller, &product, &[], Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::SelfPurchaseForbidden);
    }

    #[test]
    fn add_rejects_duplicate() {
        let buyer = UserId::new();
        let product = product_owned_by(UserId::new(), Decimal::ONE);
        let first = CartEntry::add(CartEntryId::new(), buyer, &product, &[], Utc::now()).unwrap();
        let err = CartEntry::add(CartEntryId::new(), buyer, &product, &[first], Utc::now())
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateEntry);
    }

    #[test]
    fn summary_reflects_current_prices() {
        let buyer = UserId::new();
        let mut bike = product_owned_by(UserId::new(), Decimal::new(50, 0));
        let lamp = product_owned_by(UserId::new(), Decimal::new(1250, 2));

        let lines = |bike: &Product| {
            vec![
                CartLine {
                    entry: CartEntry::add(CartEntryId::new(), buyer, bike, &[], Utc::now()).unwrap(),
                    product: bike.clone(),
                },
                CartLine {
                    entry: CartEntry::add(CartEntryId::new(), buyer, &lamp, &[], Utc::now()).unwrap(),
                    product: lamp.clone(),
                },
            ]
        };

        let summary = CartSummary::from_lines(&lines(&bike)).unwrap();
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.total_price.amount(), Decimal::new(6250, 2));

        bike.price = Price::new(Decimal::new(40, 0)).unwrap();
        let summary = CartSummary::from_lines(&lines(&bike)).unwrap();
        assert_eq!(summary.total_price.amount(), Decimal::new(5250, 2));
    }

    #[test]
    fn empty_cart_summary_is_zero() {
        let summary = CartSummary::from_lines(&[]).unwrap();
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.total_price, Price::ZERO);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: an owner can never add their own listing, whatever its price.
            #[test]
            fn owners_never_add_own_listing(cents in 0i64..10_000_000i64) {
                let owner = UserId::new();
                let product = product_owned_by(owner, Decimal::new(cents, 2));
                let result = CartEntry::add(CartEntryId::new(), owner, &product, &[], Utc::now());
                prop_assert_eq!(result, Err(DomainError::SelfPurchaseForbidden));
            }
        }
    }
}
