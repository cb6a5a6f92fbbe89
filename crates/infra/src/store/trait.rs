use std::sync::Arc;

use thiserror::Error;

use ecofinds_cart::CartEntry;
use ecofinds_catalog::{Price, Product};
use ecofinds_core::{CartEntryId, ProductId, UserId};
use ecofinds_purchasing::Purchase;
use ecofinds_reviews::Review;

/// Uniqueness constraints enforced by the store itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// One cart entry per `(user_id, product_id)`.
    CartEntry,
    /// One review per `(buyer_id, seller_id, product_id)`.
    Review,
    /// Any other unique key (primary keys, backend-specific names).
    Other(String),
}

/// Storage operation error.
///
/// These are **infrastructure errors** as opposed to domain errors. The service
/// layer maps `UniqueViolation` back onto the matching domain duplicate kind and
/// `ForeignKeyViolation` onto a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0:?}")]
    UniqueViolation(Constraint),

    /// A row still references (or no longer finds) the row it points at.
    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("transaction already finished")]
    TransactionClosed,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Which partition lock a transaction holds for its whole lifetime.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LockScope {
    /// No partition lock. Reads and writes still commit atomically.
    Unscoped,
    /// Exclusive lock on one user's cart/purchase/review partition.
    ///
    /// Two transactions scoped to the same user never overlap; transactions
    /// for different users never wait on each other.
    User(UserId),
}

/// Which cart entries a delete applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CartSelector {
    /// One entry, only if it belongs to `user_id`.
    Entry {
        user_id: UserId,
        entry_id: CartEntryId,
    },
    /// Every entry in a user's cart.
    User(UserId),
    /// Every entry, in any cart, referencing a product.
    Product(ProductId),
}

impl CartSelector {
    pub fn matches(&self, entry: &CartEntry) -> bool {
        match *self {
            CartSelector::Entry { user_id, entry_id } => {
                entry.id == entry_id && entry.user_id == user_id
            }
            CartSelector::User(user_id) => entry.user_id == user_id,
            CartSelector::Product(product_id) => entry.product_id == product_id,
        }
    }
}

/// Purchase ledger predicates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PurchaseFilter {
    Buyer(UserId),
    Seller(UserId),
    Product(ProductId),
    BuyerProduct {
        buyer_id: UserId,
        product_id: ProductId,
    },
}

impl PurchaseFilter {
    pub fn matches(&self, purchase: &Purchase) -> bool {
        match *self {
            PurchaseFilter::Buyer(buyer_id) => purchase.buyer_id == buyer_id,
            PurchaseFilter::Seller(seller_id) => purchase.seller_id == seller_id,
            PurchaseFilter::Product(product_id) => purchase.product_id == product_id,
            PurchaseFilter::BuyerProduct {
                buyer_id,
                product_id,
            } => purchase.buyer_id == buyer_id && purchase.product_id == product_id,
        }
    }
}

/// Review predicates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReviewFilter {
    Seller(UserId),
    Triple {
        buyer_id: UserId,
        seller_id: UserId,
        product_id: ProductId,
    },
}

impl ReviewFilter {
    pub fn matches(&self, review: &Review) -> bool {
        match *self {
            ReviewFilter::Seller(seller_id) => review.seller_id == seller_id,
            ReviewFilter::Triple {
                buyer_id,
                seller_id,
                product_id,
            } => {
                review.buyer_id == buyer_id
                    && review.seller_id == seller_id
                    && review.product_id == product_id
            }
        }
    }
}

/// One unit of work against the store.
///
/// Reads observe the transaction's own writes. Nothing is visible to other
/// transactions until `commit` succeeds; dropping an uncommitted transaction
/// discards every write it made.
///
/// Ordering contracts:
/// - products: newest `created_at` first;
/// - cart entries: oldest `added_at` first;
/// - purchases: newest `purchased_at` first;
/// - reviews: newest `created_at` first.
#[async_trait::async_trait]
pub trait StoreTx: Send {
    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products, or only those owned by `owner_id`.
    async fn select_products(&mut self, owner_id: Option<UserId>)
    -> Result<Vec<Product>, StoreError>;

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError>;

    async fn update_product_price(&mut self, id: ProductId, price: Price)
    -> Result<u64, StoreError>;

    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError>;

    async fn select_cart_entries(&mut self, user_id: UserId) -> Result<Vec<CartEntry>, StoreError>;

    /// Fails with `UniqueViolation(Constraint::CartEntry)` on a duplicate pair.
    async fn insert_cart_entry(&mut self, entry: &CartEntry) -> Result<(), StoreError>;

    async fn delete_cart_entries(&mut self, selector: CartSelector) -> Result<u64, StoreError>;

    async fn select_purchases(&mut self, filter: PurchaseFilter)
    -> Result<Vec<Purchase>, StoreError>;

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<(), StoreError>;

    async fn select_reviews(&mut self, filter: ReviewFilter) -> Result<Vec<Review>, StoreError>;

    /// Fails with `UniqueViolation(Constraint::Review)` on a duplicate triple.
    async fn insert_review(&mut self, review: &Review) -> Result<(), StoreError>;

    /// Make every write visible atomically, or none of them.
    ///
    /// After `commit` (successful or not) the transaction is finished and further
    /// calls return `TransactionClosed`.
    async fn commit(&mut self) -> Result<(), StoreError>;
}

/// Storage collaborator for the marketplace engine.
///
/// Implementations must:
/// - enforce the cart `(user, product)` and review `(buyer, seller, product)`
///   uniqueness themselves, not rely on callers checking first;
/// - commit each transaction all-or-nothing;
/// - honour `LockScope::User` as an exclusive per-user lock held until the
///   transaction finishes.
#[async_trait::async_trait]
pub trait MarketStore: Send + Sync {
    async fn begin(&self, scope: LockScope) -> Result<Box<dyn StoreTx>, StoreError>;
}

#[async_trait::async_trait]
impl<S> MarketStore for Arc<S>
where
    S: MarketStore + ?Sized,
{
    async fn begin(&self, scope: LockScope) -> Result<Box<dyn StoreTx>, StoreError> {
        (**self).begin(scope).await
    }
}
