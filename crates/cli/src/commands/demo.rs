//! End-to-end walkthrough on the in-memory store.
//!
//! Alice lists a bike, Bob buys it and rates her, and a second rating for the
//! same purchase is refused.

use std::sync::Arc;

use rust_decimal::Decimal;

use ecofinds_catalog::NewListing;
use ecofinds_core::{ActorContext, UserId};
use ecofinds_impact::{ImpactEstimator, SeededJitter};
use ecofinds_infra::{InMemoryMarketStore, MarketError, Marketplace};
use ecofinds_reviews::NewReview;

pub async fn run(seed: Option<u64>) -> anyhow::Result<()> {
    let estimator = match seed {
        Some(seed) => ImpactEstimator::new(Arc::new(SeededJitter::new(seed))),
        None => ImpactEstimator::default(),
    };
    let market = Marketplace::new(InMemoryMarketStore::new(), estimator);

    let alice = UserId::new();
    let bob = UserId::new();
    let alice_ctx = ActorContext::user(alice);
    let bob_ctx = ActorContext::user(bob);

    let bike = market
        .catalog
        .create_listing(
            &alice_ctx,
            NewListing {
                title: "Bike".to_string(),
                description: "City bike, recently serviced".to_string(),
                category: "Sports".to_string(),
                price: Decimal::new(50, 0),
                image_url: None,
            },
        )
        .await?;
    println!("alice listed {} at {}", bike.title, bike.price);

    market.cart.add_to_cart(&bob_ctx, bike.id).await?;
    let overview = market.cart.cart_summary(&bob_ctx).await?;
    println!("bob's cart: {}", serde_json::to_string(&overview)?);

    let result = market.checkout.checkout(&bob_ctx).await?;
    println!(
        "bob checked out {} item(s) for {}, saving ~{} kg CO2",
        result.purchases.len(),
        result.total_price,
        result.estimated_co2_kg
    );

    let review = NewReview {
        seller_id: alice,
        product_id: bike.id,
        rating: 5,
        comment: "Exactly as described".to_string(),
    };
    market.reviews.submit_review(&bob_ctx, review.clone()).await?;

    match market.reviews.submit_review(&bob_ctx, review).await {
        Err(MarketError::DuplicateReview) => println!("second review refused: duplicate"),
        Err(e) => return Err(e.into()),
        Ok(_) => anyhow::bail!("duplicate review was accepted"),
    }

    let stats = market.profile.profile_stats(&alice_ctx).await?;
    println!("alice: {}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
