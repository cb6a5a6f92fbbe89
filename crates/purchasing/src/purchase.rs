use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ecofinds_catalog::Product;
use ecofinds_core::{Entity, ProductId, PurchaseId, UserId};

/// A completed purchase. Append-only: never updated or deleted.
///
/// `seller_id` is copied from the product at checkout. A product's owner never
/// changes, so this is the same value a join would produce; keeping it on the
/// row lets sales statistics and review eligibility read the ledger alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub buyer_id: UserId,
    pub product_id: ProductId,
    pub seller_id: UserId,
    pub purchased_at: DateTime<Utc>,
}

impl Entity for Purchase {
    type Id = PurchaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Purchase-history ordering: newest first, ties broken by id.
pub fn sort_newest_first(purchases: &mut [Purchase]) {
    purchases.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at).then(b.id.cmp(&a.id)));
}

/// Number of purchases of listings sold by `seller_id`.
pub fn total_sales(purchases: &[Purchase], seller_id: UserId) -> usize {
    purchases.iter().filter(|p| p.seller_id == seller_id).count()
}

/// Number of purchases made by `buyer_id`.
pub fn total_purchases(purchases: &[Purchase], buyer_id: UserId) -> usize {
    purchases.iter().filter(|p| p.buyer_id == buyer_id).count()
}

/// A purchase joined with its product, for purchase-history display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub purchase: Purchase,
    pub product: Product,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn purchase(buyer: UserId, seller: UserId, at: DateTime<Utc>) -> Purchase {
        Purchase {
            id: PurchaseId::new(),
            buyer_id: buyer,
            product_id: ProductId::new(),
            seller_id: seller,
            purchased_at: at,
        }
    }

    #[test]
    fn counts_sales_and_purchases_separately() {
        let alice = UserId::new();
        let bob = UserId::new();
        let now = Utc::now();
        let ledger = vec![
            purchase(bob, alice, now),
            purchase(bob, alice, now),
            purchase(alice, bob, now),
        ];

        assert_eq!(total_sales(&ledger, alice), 2);
        assert_eq!(total_purchases(&ledger, alice), 1);
        assert_eq!(total_sales(&ledger, bob), 1);
        assert_eq!(total_purchases(&ledger, bob), 2);
    }

    #[test]
    fn history_is_newest_first() {
        let buyer = UserId::new();
        let seller = UserId::new();
        let now = Utc::now();
        let old = purchase(buyer, seller, now - Duration::days(2));
        let new = purchase(buyer, seller, now);

        let mut history = vec![old.clone(), new.clone()];
        sort_newest_first(&mut history);
        assert_eq!(history, vec![new, old]);
    }
}
