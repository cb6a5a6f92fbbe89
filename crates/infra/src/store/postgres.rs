//! Postgres-backed marketplace store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation on `cart_entries_user_product_key`) | `23505` | `UniqueViolation(CartEntry)` |
//! | Database (unique violation on `reviews_buyer_seller_product_key`) | `23505` | `UniqueViolation(Review)` |
//! | Database (any other unique violation) | `23505` | `UniqueViolation(Other)` |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (check / other) | any | `Backend` |
//! | PoolClosed, Io, ... | N/A | `Backend` |
//!
//! ## Locking
//!
//! `LockScope::User` takes `pg_advisory_xact_lock` on a hash of the user id as
//! the first statement of the transaction. Postgres releases it on commit or
//! rollback, so a dropped transaction never leaks the lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use ecofinds_cart::CartEntry;
use ecofinds_catalog::{Price, Product};
use ecofinds_core::{CartEntryId, ProductId, PurchaseId, ReviewId, UserId};
use ecofinds_purchasing::Purchase;
use ecofinds_reviews::{Rating, Review};

use super::r#trait::{
    CartSelector, Constraint, LockScope, MarketStore, PurchaseFilter, ReviewFilter, StoreError,
    StoreTx,
};
use crate::config::StoreConfig;

const CART_ENTRY_KEY: &str = "cart_entries_user_product_key";
const REVIEW_KEY: &str = "reviews_buyer_seller_product_key";

/// Postgres-backed marketplace store.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PgMarketStore {
    pool: Arc<PgPool>,
}

impl PgMarketStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool sized by `config`.
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }
}

#[async_trait::async_trait]
impl MarketStore for PgMarketStore {
    #[instrument(skip(self), err(level = "warn"))]
    async fn begin(&self, scope: LockScope) -> Result<Box<dyn StoreTx>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        if let LockScope::User(user_id) = scope {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                .bind(user_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("advisory_lock", e))?;
        }

        Ok(Box::new(PgTx { tx: Some(tx) }))
    }
}

struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait::async_trait]
impl StoreTx for PgTx {
    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let tx = self.tx()?;
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, description, category, price, image_url, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn select_products(
        &mut self,
        owner_id: Option<UserId>,
    ) -> Result<Vec<Product>, StoreError> {
        let tx = self.tx()?;
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, title, description, category, price, image_url, created_at
            FROM products
            WHERE $1::uuid IS NULL OR owner_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id.map(|o| *o.as_uuid()))
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("select_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(
            r#"
            INSERT INTO products (id, owner_id, title, description, category, price, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.owner_id.as_uuid())
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price.amount())
        .bind(product.image_url.as_deref())
        .bind(product.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn update_product_price(
        &mut self,
        id: ProductId,
        price: Price,
    ) -> Result<u64, StoreError> {
        let tx = self.tx()?;
        let result = sqlx::query("UPDATE products SET price = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(price.amount())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_product_price", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError> {
        let tx = self.tx()?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected())
    }

    async fn select_cart_entries(&mut self, user_id: UserId) -> Result<Vec<CartEntry>, StoreError> {
        let tx = self.tx()?;
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, product_id, added_at
            FROM cart_entries
            WHERE user_id = $1
            ORDER BY added_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("select_cart_entries", e))?;

        rows.iter().map(cart_entry_from_row).collect()
    }

    async fn insert_cart_entry(&mut self, entry: &CartEntry) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(
            r#"
            INSERT INTO cart_entries (id, user_id, product_id, added_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.product_id.as_uuid())
        .bind(entry.added_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_cart_entry", e))?;
        Ok(())
    }

    async fn delete_cart_entries(&mut self, selector: CartSelector) -> Result<u64, StoreError> {
        let tx = self.tx()?;
        let query = match selector {
            CartSelector::Entry { user_id, entry_id } => {
                sqlx::query("DELETE FROM cart_entries WHERE id = $1 AND user_id = $2")
                    .bind(*entry_id.as_uuid())
                    .bind(*user_id.as_uuid())
            }
            CartSelector::User(user_id) => {
                sqlx::query("DELETE FROM cart_entries WHERE user_id = $1").bind(*user_id.as_uuid())
            }
            CartSelector::Product(product_id) => {
                sqlx::query("DELETE FROM cart_entries WHERE product_id = $1")
                    .bind(*product_id.as_uuid())
            }
        };

        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("delete_cart_entries", e))?;
        Ok(result.rows_affected())
    }

    async fn select_purchases(
        &mut self,
        filter: PurchaseFilter,
    ) -> Result<Vec<Purchase>, StoreError> {
        let tx = self.tx()?;
        let (predicate, first, second) = match filter {
            PurchaseFilter::Buyer(buyer_id) => ("buyer_id = $1", *buyer_id.as_uuid(), None),
            PurchaseFilter::Seller(seller_id) => ("seller_id = $1", *seller_id.as_uuid(), None),
            PurchaseFilter::Product(product_id) => ("product_id = $1", *product_id.as_uuid(), None),
            PurchaseFilter::BuyerProduct {
                buyer_id,
                product_id,
            } => (
                "buyer_id = $1 AND product_id = $2",
                *buyer_id.as_uuid(),
                Some(*product_id.as_uuid()),
            ),
        };

        let sql = format!(
            "SELECT id, buyer_id, product_id, seller_id, purchased_at \
             FROM purchases WHERE {predicate} \
             ORDER BY purchased_at DESC, id DESC"
        );
        let mut query = sqlx::query(&sql).bind(first);
        if let Some(second) = second {
            query = query.bind(second);
        }

        let rows = query
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("select_purchases", e))?;

        rows.iter().map(purchase_from_row).collect()
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(
            r#"
            INSERT INTO purchases (id, buyer_id, product_id, seller_id, purchased_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(purchase.id.as_uuid())
        .bind(purchase.buyer_id.as_uuid())
        .bind(purchase.product_id.as_uuid())
        .bind(purchase.seller_id.as_uuid())
        .bind(purchase.purchased_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase", e))?;
        Ok(())
    }

    async fn select_reviews(&mut self, filter: ReviewFilter) -> Result<Vec<Review>, StoreError> {
        let tx = self.tx()?;
        let query = match filter {
            ReviewFilter::Seller(seller_id) => sqlx::query(
                r#"
                SELECT id, buyer_id, seller_id, product_id, rating, comment, created_at
                FROM reviews
                WHERE seller_id = $1
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(*seller_id.as_uuid()),
            ReviewFilter::Triple {
                buyer_id,
                seller_id,
                product_id,
            } => sqlx::query(
                r#"
                SELECT id, buyer_id, seller_id, product_id, rating, comment, created_at
                FROM reviews
                WHERE buyer_id = $1 AND seller_id = $2 AND product_id = $3
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(*buyer_id.as_uuid())
            .bind(*seller_id.as_uuid())
            .bind(*product_id.as_uuid()),
        };

        let rows = query
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("select_reviews", e))?;

        rows.iter().map(review_from_row).collect()
    }

    async fn insert_review(&mut self, review: &Review) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(
            r#"
            INSERT INTO reviews (id, buyer_id, seller_id, product_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.buyer_id.as_uuid())
        .bind(review.seller_id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(i16::from(review.rating.value()))
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_review", e))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Backend(format!("failed to read column {name}: {e}")))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let price: Decimal = column(row, "price")?;
    Ok(Product {
        id: ProductId::from_uuid(column(row, "id")?),
        owner_id: UserId::from_uuid(column(row, "owner_id")?),
        title: column(row, "title")?,
        description: column(row, "description")?,
        category: column(row, "category")?,
        price: Price::new(price).map_err(|e| StoreError::Backend(format!("stored price: {e}")))?,
        image_url: column(row, "image_url")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn cart_entry_from_row(row: &PgRow) -> Result<CartEntry, StoreError> {
    Ok(CartEntry {
        id: CartEntryId::from_uuid(column(row, "id")?),
        user_id: UserId::from_uuid(column(row, "user_id")?),
        product_id: ProductId::from_uuid(column(row, "product_id")?),
        added_at: column(row, "added_at")?,
    })
}

fn purchase_from_row(row: &PgRow) -> Result<Purchase, StoreError> {
    Ok(Purchase {
        id: PurchaseId::from_uuid(column(row, "id")?),
        buyer_id: UserId::from_uuid(column(row, "buyer_id")?),
        product_id: ProductId::from_uuid(column(row, "product_id")?),
        seller_id: UserId::from_uuid(column(row, "seller_id")?),
        purchased_at: column(row, "purchased_at")?,
    })
}

fn review_from_row(row: &PgRow) -> Result<Review, StoreError> {
    let rating: i16 = column(row, "rating")?;
    Ok(Review {
        id: ReviewId::from_uuid(column(row, "id")?),
        buyer_id: UserId::from_uuid(column(row, "buyer_id")?),
        seller_id: UserId::from_uuid(column(row, "seller_id")?),
        product_id: ProductId::from_uuid(column(row, "product_id")?),
        rating: Rating::new(i64::from(rating))
            .map_err(|e| StoreError::Backend(format!("stored rating: {e}")))?,
        comment: column(row, "comment")?,
        created_at: column(row, "created_at")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = match db_err.constraint() {
                    Some(CART_ENTRY_KEY) => Constraint::CartEntry,
                    Some(REVIEW_KEY) => Constraint::Review,
                    Some(other) => Constraint::Other(other.to_string()),
                    None => Constraint::Other(db_err.message().to_string()),
                };
                return StoreError::UniqueViolation(constraint);
            }
            if db_err.code().as_deref() == Some("23503") {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::ForeignKeyViolation(constraint);
            }
            StoreError::Backend(format!(
                "database error in {operation}: {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
