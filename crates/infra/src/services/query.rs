//! Joins shared by the read paths.

use ecofinds_cart::CartLine;
use ecofinds_core::UserId;
use ecofinds_purchasing::{Purchase, PurchaseLine};

use crate::store::{StoreError, StoreTx};

/// The user's cart joined with current product rows, oldest entry first.
///
/// Products referenced by a cart entry cannot be deleted without cascading to
/// the entry, so a missing product is a store inconsistency, not a skip.
pub(crate) async fn load_cart_lines(
    tx: &mut dyn StoreTx,
    user_id: UserId,
) -> Result<Vec<CartLine>, StoreError> {
    let entries = tx.select_cart_entries(user_id).await?;
    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        let product = tx.get_product(entry.product_id).await?.ok_or_else(|| {
            StoreError::Backend(format!(
                "cart entry {} references missing product {}",
                entry.id, entry.product_id
            ))
        })?;
        lines.push(CartLine { entry, product });
    }
    Ok(lines)
}

/// Purchases joined with their product rows, in the given order.
pub(crate) async fn load_purchase_lines(
    tx: &mut dyn StoreTx,
    purchases: Vec<Purchase>,
) -> Result<Vec<PurchaseLine>, StoreError> {
    let mut lines = Vec::with_capacity(purchases.len());
    for purchase in purchases {
        let product = tx.get_product(purchase.product_id).await?.ok_or_else(|| {
            StoreError::Backend(format!(
                "purchase {} references missing product {}",
                purchase.id, purchase.product_id
            ))
        })?;
        lines.push(PurchaseLine { purchase, product });
    }
    Ok(lines)
}
