use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::{Mutex as PartitionLock, OwnedMutexGuard};

use ecofinds_cart::{CartEntry, sort_by_added};
use ecofinds_catalog::{Price, Product, sort_newest_first as sort_products};
use ecofinds_core::{Entity, ProductId, UserId};
use ecofinds_purchasing::{Purchase, sort_newest_first as sort_purchases};
use ecofinds_reviews::Review;

use super::r#trait::{
    CartSelector, Constraint, LockScope, MarketStore, PurchaseFilter, ReviewFilter, StoreError,
    StoreTx,
};

/// Points at which the in-memory store can be told to fail once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    InsertPurchase,
    DeleteCartEntries,
    Commit,
}

#[derive(Debug, Clone)]
enum WriteOp {
    InsertProduct(Product),
    UpdateProductPrice(ProductId, Price),
    DeleteProduct(ProductId),
    InsertCartEntry(CartEntry),
    DeleteCartEntries(CartSelector),
    InsertPurchase(Purchase),
    InsertReview(Review),
}

#[derive(Debug, Default, Clone)]
struct Tables {
    products: HashMap<ProductId, Product>,
    cart_entries: Vec<CartEntry>,
    purchases: Vec<Purchase>,
    reviews: Vec<Review>,
}

/// Primary key check.
fn has_row<E: Entity>(rows: &[E], row: &E) -> bool {
    rows.iter().any(|r| r.id() == row.id())
}

impl Tables {
    /// Apply one write with the same constraints the relational schema has.
    fn apply(&mut self, op: &WriteOp) -> Result<u64, StoreError> {
        match op {
            WriteOp::InsertProduct(product) => {
                if self.products.contains_key(product.id()) {
                    return Err(StoreError::UniqueViolation(Constraint::Other(
                        "products_pkey".to_string(),
                    )));
                }
                self.products.insert(product.id, product.clone());
                Ok(1)
            }
            WriteOp::UpdateProductPrice(id, price) => match self.products.get_mut(id) {
                Some(product) => {
                    product.price = *price;
                    Ok(1)
                }
                None => Ok(0),
            },
            WriteOp::DeleteProduct(id) => {
                if !self.products.contains_key(id) {
                    return Ok(0);
                }
                if self.purchases.iter().any(|p| p.product_id == *id) {
                    return Err(StoreError::ForeignKeyViolation(
                        "purchases_product_id_fkey".to_string(),
                    ));
                }
                if self.reviews.iter().any(|r| r.product_id == *id) {
                    return Err(StoreError::ForeignKeyViolation(
                        "reviews_product_id_fkey".to_string(),
                    ));
                }
                self.products.remove(id);
                self.cart_entries.retain(|e| e.product_id != *id);
                Ok(1)
            }
            WriteOp::InsertCartEntry(entry) => {
                if !self.products.contains_key(&entry.product_id) {
                    return Err(StoreError::ForeignKeyViolation(
                        "cart_entries_product_id_fkey".to_string(),
                    ));
                }
                if has_row(&self.cart_entries, entry) {
                    return Err(StoreError::UniqueViolation(Constraint::Other(
                        "cart_entries_pkey".to_string(),
                    )));
                }
                if self
                    .cart_entries
                    .iter()
                    .any(|e| e.user_id == entry.user_id && e.product_id == entry.product_id)
                {
                    return Err(StoreError::UniqueViolation(Constraint::CartEntry));
                }
                self.cart_entries.push(entry.clone());
                Ok(1)
            }
            WriteOp::DeleteCartEntries(selector) => {
                let before = self.cart_entries.len();
                self.cart_entries.retain(|e| !selector.matches(e));
                Ok((before - self.cart_entries.len()) as u64)
            }
            WriteOp::InsertPurchase(purchase) => {
                if !self.products.contains_key(&purchase.product_id) {
                    return Err(StoreError::ForeignKeyViolation(
                        "purchases_product_id_fkey".to_string(),
                    ));
                }
                if has_row(&self.purchases, purchase) {
                    return Err(StoreError::UniqueViolation(Constraint::Other(
                        "purchases_pkey".to_string(),
                    )));
                }
                self.purchases.push(purchase.clone());
                Ok(1)
            }
            WriteOp::InsertReview(review) => {
                if !self.products.contains_key(&review.product_id) {
                    return Err(StoreError::ForeignKeyViolation(
                        "reviews_product_id_fkey".to_string(),
                    ));
                }
                if has_row(&self.reviews, review) {
                    return Err(StoreError::UniqueViolation(Constraint::Other(
                        "reviews_pkey".to_string(),
                    )));
                }
                let duplicate = ReviewFilter::Triple {
                    buyer_id: review.buyer_id,
                    seller_id: review.seller_id,
                    product_id: review.product_id,
                };
                if self.reviews.iter().any(|r| duplicate.matches(r)) {
                    return Err(StoreError::UniqueViolation(Constraint::Review));
                }
                self.reviews.push(review.clone());
                Ok(1)
            }
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    partitions: Mutex<HashMap<UserId, Arc<PartitionLock<()>>>>,
    faults: Mutex<Vec<FaultPoint>>,
}

impl Shared {
    fn partition(&self, user_id: UserId) -> Result<Arc<PartitionLock<()>>, StoreError> {
        let mut partitions = self
            .partitions
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(partitions.entry(user_id).or_default().clone())
    }

    fn trip(&self, point: FaultPoint) -> Result<(), StoreError> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        if let Some(pos) = faults.iter().position(|f| *f == point) {
            faults.remove(pos);
            return Err(StoreError::Backend(format!("injected fault at {point:?}")));
        }
        Ok(())
    }
}

/// In-memory marketplace store.
///
/// Intended for tests/dev. Not optimized for performance: every transaction
/// works on a private copy of the tables and replays its writes against the
/// latest committed state on commit, re-checking every constraint.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMarketStore {
    shared: Arc<Shared>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation reaching `point` fail with a backend error.
    pub fn fail_next(&self, point: FaultPoint) {
        match self.shared.faults.lock() {
            Ok(mut faults) => faults.push(point),
            Err(poisoned) => poisoned.into_inner().push(point),
        }
    }
}

#[async_trait::async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn begin(&self, scope: LockScope) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = match scope {
            LockScope::Unscoped => None,
            LockScope::User(user_id) => Some(self.shared.partition(user_id)?.lock_owned().await),
        };

        let working = self
            .shared
            .tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?
            .clone();

        Ok(Box::new(InMemoryTx {
            shared: self.shared.clone(),
            working,
            log: Vec::new(),
            open: true,
            _partition: guard,
        }))
    }
}

struct InMemoryTx {
    shared: Arc<Shared>,
    working: Tables,
    log: Vec<WriteOp>,
    open: bool,
    _partition: Option<OwnedMutexGuard<()>>,
}

impl InMemoryTx {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::TransactionClosed)
        }
    }

    fn write(&mut self, op: WriteOp) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let affected = self.working.apply(&op)?;
        self.log.push(op);
        Ok(affected)
    }
}

#[async_trait::async_trait]
impl StoreTx for InMemoryTx {
    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.ensure_open()?;
        Ok(self.working.products.get(&id).cloned())
    }

    async fn select_products(
        &mut self,
        owner_id: Option<UserId>,
    ) -> Result<Vec<Product>, StoreError> {
        self.ensure_open()?;
        let mut products: Vec<Product> = self
            .working
            .products
            .values()
            .filter(|p| owner_id.is_none_or(|owner| p.owner_id == owner))
            .cloned()
            .collect();
        sort_products(&mut products);
        Ok(products)
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        self.write(WriteOp::InsertProduct(product.clone()))?;
        Ok(())
    }

    async fn update_product_price(
        &mut self,
        id: ProductId,
        price: Price,
    ) -> Result<u64, StoreError> {
        self.write(WriteOp::UpdateProductPrice(id, price))
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError> {
        self.write(WriteOp::DeleteProduct(id))
    }

    async fn select_cart_entries(&mut self, user_id: UserId) -> Result<Vec<CartEntry>, StoreError> {
        self.ensure_open()?;
        let mut entries: Vec<CartEntry> = self
            .working
            .cart_entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        sort_by_added(&mut entries);
        Ok(entries)
    }

    async fn insert_cart_entry(&mut self, entry: &CartEntry) -> Result<(), StoreError> {
        self.write(WriteOp::InsertCartEntry(entry.clone()))?;
        Ok(())
    }

    async fn delete_cart_entries(&mut self, selector: CartSelector) -> Result<u64, StoreError> {
        self.ensure_open()?;
        self.shared.trip(FaultPoint::DeleteCartEntries)?;
        self.write(WriteOp::DeleteCartEntries(selector))
    }

    async fn select_purchases(
        &mut self,
        filter: PurchaseFilter,
    ) -> Result<Vec<Purchase>, StoreError> {
        self.ensure_open()?;
        let mut purchases: Vec<Purchase> = self
            .working
            .purchases
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        sort_purchases(&mut purchases);
        Ok(purchases)
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.shared.trip(FaultPoint::InsertPurchase)?;
        self.write(WriteOp::InsertPurchase(purchase.clone()))?;
        Ok(())
    }

    async fn select_reviews(&mut self, filter: ReviewFilter) -> Result<Vec<Review>, StoreError> {
        self.ensure_open()?;
        let mut reviews: Vec<Review> = self
            .working
            .reviews
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    async fn insert_review(&mut self, review: &Review) -> Result<(), StoreError> {
        self.write(WriteOp::InsertReview(review.clone()))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.open = false;
        self.shared.trip(FaultPoint::Commit)?;

        if self.log.is_empty() {
            return Ok(());
        }

        let mut tables = self
            .shared
            .tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        // Replay against the latest committed state; another transaction may
        // have committed since this one began.
        let mut next = tables.clone();
        for op in &self.log {
            next.apply(op)?;
        }
        *tables = next;
        self.log.clear();
        Ok(())
    }
}
