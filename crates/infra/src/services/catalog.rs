use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use ecofinds_catalog::{FeedQuery, NewListing, Price, Product};
use ecofinds_core::{ActorContext, ProductId};

use crate::error::{MarketError, MarketResult};
use crate::store::{CartSelector, LockScope, MarketStore, PurchaseFilter};

/// Seller-side listing management and the public feed.
#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: MarketStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, actor, listing), fields(owner_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn create_listing(
        &self,
        actor: &ActorContext,
        listing: NewListing,
    ) -> MarketResult<Product> {
        let owner_id = actor.require_user()?;
        let product = Product::list(ProductId::new(), owner_id, listing, Utc::now())?;

        let mut tx = self.store.begin(LockScope::Unscoped).await?;
        tx.insert_product(&product).await?;
        tx.commit().await?;

        info!(product_id = %product.id, "listing created");
        Ok(product)
    }

    /// The acting user's listings, newest first.
    #[instrument(skip(self, actor), fields(owner_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn my_listings(&self, actor: &ActorContext) -> MarketResult<Vec<Product>> {
        let owner_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::Unscoped).await?;
        Ok(tx.select_products(Some(owner_id)).await?)
    }

    #[instrument(skip(self), err(level = "warn"))]
    pub async fn get_product(&self, product_id: ProductId) -> MarketResult<Product> {
        let mut tx = self.store.begin(LockScope::Unscoped).await?;
        tx.get_product(product_id)
            .await?
            .ok_or(MarketError::NotFound)
    }

    /// Change the asking price. Carts pick the new price up on their next read.
    #[instrument(skip(self, actor), fields(owner_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn reprice_listing(
        &self,
        actor: &ActorContext,
        product_id: ProductId,
        price: Decimal,
    ) -> MarketResult<Product> {
        let owner_id = actor.require_user()?;
        let price = Price::new(price)?;
        let mut tx = self.store.begin(LockScope::Unscoped).await?;

        let mut product = tx
            .get_product(product_id)
            .await?
            .filter(|p| p.is_owned_by(owner_id))
            .ok_or(MarketError::NotFound)?;

        tx.update_product_price(product.id, price).await?;
        tx.commit().await?;

        info!(%product_id, %price, "listing repriced");
        product.price = price;
        Ok(product)
    }

    /// Remove a listing and every cart entry pointing at it.
    ///
    /// Only the owner may delete; anyone else gets `NotFound`. Once a listing
    /// appears in the purchase ledger it can no longer be deleted.
    #[instrument(skip(self, actor), fields(owner_id = ?actor.user_id()), err(level = "warn"))]
    pub async fn delete_listing(
        &self,
        actor: &ActorContext,
        product_id: ProductId,
    ) -> MarketResult<()> {
        let owner_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::Unscoped).await?;

        let product = tx
            .get_product(product_id)
            .await?
            .filter(|p| p.is_owned_by(owner_id))
            .ok_or(MarketError::NotFound)?;

        if !tx
            .select_purchases(PurchaseFilter::Product(product.id))
            .await?
            .is_empty()
        {
            return Err(MarketError::Conflict(format!(
                "listing {} has already been purchased",
                product.id
            )));
        }

        let removed_from_carts = tx
            .delete_cart_entries(CartSelector::Product(product.id))
            .await?;
        tx.delete_product(product.id).await?;
        tx.commit().await?;

        info!(%product_id, removed_from_carts, "listing deleted");
        Ok(())
    }

    /// Public listing feed, newest first.
    #[instrument(skip(self, query), err(level = "warn"))]
    pub async fn feed(&self, query: &FeedQuery) -> MarketResult<Vec<Product>> {
        let mut tx = self.store.begin(LockScope::Unscoped).await?;
        let products = tx.select_products(None).await?;
        Ok(products.into_iter().filter(|p| query.matches(p)).collect())
    }
}
