use serde::{Deserialize, Serialize};

use ecofinds_core::UserId;

use crate::product::Product;

/// Filter for browsing listings.
///
/// All criteria are optional and combine with AND. Text matching is
/// case-insensitive; `search` looks at title and description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    /// Hide listings owned by this user (a viewer's own items).
    pub exclude_owner: Option<UserId>,
}

impl FeedQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(owner) = self.exclude_owner {
            if product.owner_id == owner {
                return false;
            }
        }

        if let Some(category) = non_blank(&self.category) {
            if !product.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }

        if let Some(term) = non_blank(&self.search) {
            let term = term.to_lowercase();
            let in_title = product.title.to_lowercase().contains(&term);
            let in_description = product.description.to_lowercase().contains(&term);
            if !in_title && !in_description {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Newest listings first; ties broken by id so the order is total.
pub fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use ecofinds_core::ProductId;

    use super::*;
    use crate::product::{NewListing, Product};

    fn product(owner: UserId, title: &str, category: &str) -> Product {
        Product::list(
            ProductId::new(),
            owner,
            NewListing {
                title: title.to_string(),
                description: "vintage, good condition".to_string(),
                category: category.to_string(),
                price: Decimal::TEN,
                image_url: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_query_matches_everything() {
        let p = product(UserId::new(), "Bike", "Sports");
        assert!(FeedQuery::default().matches(&p));
    }

    #[test]
    fn category_match_ignores_case() {
        let p = product(UserId::new(), "Bike", "Sports");
        let query = FeedQuery {
            category: Some("sports".to_string()),
            ..FeedQuery::default()
        };
        assert!(query.matches(&p));

        let other = FeedQuery {
            category: Some("Books".to_string()),
            ..FeedQuery::default()
        };
        assert!(!other.matches(&p));
    }

    #[test]
    fn search_looks_at_title_and_description() {
        let p = product(UserId::new(), "Road Bike", "Sports");
        let by_title = FeedQuery {
            search: Some("road".to_string()),
            ..FeedQuery::default()
        };
        let by_description = FeedQuery {
            search: Some("VINTAGE".to_string()),
            ..FeedQuery::default()
        };
        let miss = FeedQuery {
            search: Some("guitar".to_string()),
            ..FeedQuery::default()
        };
        assert!(by_title.matches(&p));
        assert!(by_description.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn own_listings_can_be_hidden() {
        let owner = UserId::new();
        let p = product(owner, "Bike", "Sports");
        let query = FeedQuery {
            exclude_owner: Some(owner),
            ..FeedQuery::default()
        };
        assert!(!query.matches(&p));
    }

    #[test]
    fn sorts_newest_first() {
        let owner = UserId::new();
        let mut older = product(owner, "Old", "Misc");
        older.created_at -= Duration::hours(1);
        let newer = product(owner, "New", "Misc");

        let mut items = vec![older.clone(), newer.clone()];
        sort_newest_first(&mut items);
        assert_eq!(items[0].id, newer.id);
        assert_eq!(items[1].id, older.id);
    }
}
