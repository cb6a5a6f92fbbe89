//! Checkout planning.
//!
//! Turning a cart into purchases is split in two: this module decides *what* to
//! write from a snapshot of the cart (pure, deterministic given ids and time),
//! and the infra checkout engine writes it inside one locked transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ecofinds_cart::CartLine;
use ecofinds_catalog::Price;
use ecofinds_core::{CartEntryId, DomainError, DomainResult, PurchaseId, UserId};

use crate::purchase::Purchase;

/// Writes required to check out one cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPlan {
    pub buyer_id: UserId,
    /// One purchase per cart entry, in cart order.
    pub purchases: Vec<Purchase>,
    /// Cart entries the plan consumes; all of them must be removed on commit.
    pub consumed_entries: Vec<CartEntryId>,
    /// Sum of current product prices over the snapshot.
    pub total_price: Price,
}

impl CheckoutPlan {
    /// Build the plan for `buyer_id` from the cart snapshot `lines`.
    ///
    /// `next_id` is called once per line, in order.
    pub fn from_snapshot(
        buyer_id: UserId,
        lines: &[CartLine],
        purchased_at: DateTime<Utc>,
        mut next_id: impl FnMut() -> PurchaseId,
    ) -> DomainResult<Self> {
        let mut purchases = Vec::with_capacity(lines.len());
        let mut consumed_entries = Vec::with_capacity(lines.len());

        for line in lines {
            if line.entry.user_id != buyer_id {
                return Err(DomainError::conflict(format!(
                    "cart entry {} does not belong to the buyer",
                    line.entry.id
                )));
            }
            if line.entry.product_id != line.product.id {
                return Err(DomainError::conflict(format!(
                    "cart entry {} joined with the wrong product",
                    line.entry.id
                )));
            }
            if line.product.is_owned_by(buyer_id) {
                return Err(DomainError::SelfPurchaseForbidden);
            }

            purchases.push(Purchase {
                id: next_id(),
                buyer_id,
                product_id: line.product.id,
                seller_id: line.product.owner_id,
                purchased_at,
            });
            consumed_entries.push(line.entry.id);
        }

        Ok(Self {
            buyer_id,
            purchases,
            consumed_entries,
            total_price: Price::total(lines.iter().map(CartLine::price))?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.purchases.len()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use ecofinds_cart::CartEntry;
    use ecofinds_catalog::{NewListing, Product};
    use ecofinds_core::ProductId;

    use super::*;

    fn line(buyer: UserId, seller: UserId, price: i64) -> CartLine {
        let product = Product::list(
            ProductId::new(),
            seller,
            NewListing {
                title: "Item".to_string(),
                description: String::new(),
                category: "Misc".to_string(),
                price: Decimal::new(price, 0),
                image_url: None,
            },
            Utc::now(),
        )
        .unwrap();
        let entry = CartEntry::add(CartEntryId::new(), buyer, &product, &[], Utc::now()).unwrap();
        CartLine { entry, product }
    }

    #[test]
    fn one_purchase_per_line() {
        let buyer = UserId::new();
        let seller = UserId::new();
        let lines = vec![line(buyer, seller, 50), line(buyer, seller, 20)];
        let now = Utc::now();

        let plan = CheckoutPlan::from_snapshot(buyer, &lines, now, PurchaseId::new).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.total_price.amount(), Decimal::new(70, 0));
        for (purchase, line) in plan.purchases.iter().zip(&lines) {
            assert_eq!(purchase.buyer_id, buyer);
            assert_eq!(purchase.seller_id, seller);
            assert_eq!(purchase.product_id, line.product.id);
            assert_eq!(purchase.purchased_at, now);
        }
        assert_eq!(
            plan.consumed_entries,
            lines.iter().map(|l| l.entry.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_snapshot_gives_empty_plan() {
        let plan =
            CheckoutPlan::from_snapshot(UserId::new(), &[], Utc::now(), PurchaseId::new).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_price, Price::ZERO);
    }

    #[test]
    fn rejects_entries_of_another_user() {
        let buyer = UserId::new();
        let lines = vec![line(UserId::new(), UserId::new(), 5)];
        let err = CheckoutPlan::from_snapshot(buyer, &lines, Utc::now(), PurchaseId::new)
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn ids_are_drawn_in_cart_order() {
        let buyer = UserId::new();
        let lines = vec![line(buyer, UserId::new(), 1), line(buyer, UserId::new(), 2)];
        let ids = [PurchaseId::new(), PurchaseId::new()];
        let mut iter = ids.iter().copied();

        let plan = CheckoutPlan::from_snapshot(buyer, &lines, Utc::now(), || {
            iter.next().unwrap()
        })
        .unwrap();

        assert_eq!(plan.purchases[0].id, ids[0]);
        assert_eq!(plan.purchases[1].id, ids[1]);
    }
}
