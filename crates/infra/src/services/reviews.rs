use chrono::Utc;
use tracing::{info, instrument};

use ecofinds_core::{ActorContext, ReviewId, UserId};
use ecofinds_reviews::{NewReview, Review, SellerRating};

use crate::error::MarketResult;
use crate::store::{LockScope, MarketStore, PurchaseFilter, ReviewFilter};

#[derive(Debug, Clone)]
pub struct ReviewService<S> {
    store: S,
}

impl<S: MarketStore> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Rate a seller for a product the acting user bought from them.
    ///
    /// Checked in order: rating range, purchase eligibility, duplicate triple.
    /// The store's unique key on `(buyer, seller, product)` backs the last check.
    #[instrument(
        skip(self, actor, request),
        fields(
            buyer_id = ?actor.user_id(),
            seller_id = %request.seller_id,
            product_id = %request.product_id,
            rating = request.rating
        ),
        err(level = "warn")
    )]
    pub async fn submit_review(
        &self,
        actor: &ActorContext,
        request: NewReview,
    ) -> MarketResult<Review> {
        let buyer_id = actor.require_user()?;
        let mut tx = self.store.begin(LockScope::User(buyer_id)).await?;

        let purchases = tx
            .select_purchases(PurchaseFilter::BuyerProduct {
                buyer_id,
                product_id: request.product_id,
            })
            .await?;
        let existing = tx
            .select_reviews(ReviewFilter::Triple {
                buyer_id,
                seller_id: request.seller_id,
                product_id: request.product_id,
            })
            .await?;

        let review = Review::submit(
            ReviewId::new(),
            buyer_id,
            request,
            &purchases,
            &existing,
            Utc::now(),
        )?;

        tx.insert_review(&review).await?;
        tx.commit().await?;

        info!(review_id = %review.id, "review recorded");
        Ok(review)
    }

    /// Average and count over every review addressed to `seller_id`.
    #[instrument(skip(self), err(level = "warn"))]
    pub async fn seller_rating(&self, seller_id: UserId) -> MarketResult<SellerRating> {
        let mut tx = self.store.begin(LockScope::Unscoped).await?;
        let reviews = tx.select_reviews(ReviewFilter::Seller(seller_id)).await?;
        Ok(SellerRating::for_seller(seller_id, &reviews))
    }
}
