use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

/// Optional cap on the recipe lists embedded in subscription profiles.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct RecipesLimit {
    pub recipes_limit: Option<i64>,
}

impl RecipesLimit {
    /// Negative caps are meaningless; treat them as "no recipes".
    pub fn normalized(&self) -> Option<i64> {
        self.recipes_limit.map(|limit| limit.max(0))
    }
}

// Pagination fields are inlined rather than `#[serde(flatten)]`-ed:
// serde_urlencoded buffers flattened values as strings and fails to
// deserialize the numeric fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub recipes_limit: Option<i64>,
}

impl SubscriptionQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn recipes_limit(&self) -> RecipesLimit {
        RecipesLimit {
            recipes_limit: self.recipes_limit,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecipeQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub author: Option<Uuid>,
    /// Comma-separated tag slugs; a recipe matches when it carries any of
    /// them.
    pub tags: Option<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn tag_slugs(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngredientQuery {
    /// Name prefix filter.
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use axum::{extract::Query, http::Uri};

    use super::*;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), (1, 100, 0));
    }

    #[test]
    fn tag_slugs_splits_and_trims() {
        let q = RecipeQuery {
            page: None,
            per_page: None,
            author: None,
            tags: Some("breakfast, dinner,,".into()),
            is_favorited: None,
            is_in_shopping_cart: None,
        };
        assert_eq!(q.tag_slugs(), vec!["breakfast", "dinner"]);
    }

    #[test]
    fn recipe_query_parses_pagination_from_uri() {
        let uri: Uri = "/api/recipes?page=2&per_page=10&is_favorited=true"
            .parse()
            .unwrap();
        let Query(q) = Query::<RecipeQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.pagination().normalize(), (2, 10, 10));
        assert_eq!(q.is_favorited, Some(true));
    }

    #[test]
    fn subscription_query_parses_pagination_from_uri() {
        let uri: Uri = "/api/users/subscriptions?page=1&recipes_limit=3"
            .parse()
            .unwrap();
        let Query(q) = Query::<SubscriptionQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.pagination().normalize(), (1, 20, 0));
        assert_eq!(q.recipes_limit().normalized(), Some(3));
    }

    #[test]
    fn negative_recipes_limit_is_clamped() {
        let limit = RecipesLimit {
            recipes_limit: Some(-1),
        };
        assert_eq!(limit.normalized(), Some(0));
    }
}
