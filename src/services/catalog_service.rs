use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Ingredient, Tag},
    response::{ApiResponse, Meta},
    routes::params::{IngredientQuery, Pagination},
    state::AppState,
};

// Tags and ingredients are immutable reference data maintained outside the
// API; the surface is read-only.

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<Vec<Tag>>> {
    let tags: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(&state.pool)
        .await?;
    Ok(ApiResponse::success("OK", tags, None))
}

pub async fn get_tag(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Tag>> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    match tag {
        Some(tag) => Ok(ApiResponse::success("OK", tag, None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn list_ingredients(
    state: &AppState,
    pagination: Pagination,
    query: IngredientQuery,
) -> AppResult<ApiResponse<Vec<Ingredient>>> {
    let (page, per_page, offset) = pagination.normalize();
    let prefix = like_prefix(&query.name.unwrap_or_default());

    let items: Vec<Ingredient> = sqlx::query_as(
        r#"
        SELECT * FROM ingredients
        WHERE name LIKE $1
        ORDER BY name
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&prefix)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE name LIKE $1")
        .bind(&prefix)
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, per_page, total.0);
    Ok(ApiResponse::success("OK", items, Some(meta)))
}

/// LIKE treats `%` and `_` as wildcards; escape them so a user-supplied
/// filter stays a literal prefix match.
fn like_prefix(name: &str) -> String {
    let escaped = name
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

pub async fn get_ingredient(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Ingredient>> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    match ingredient {
        Some(ingredient) => Ok(ApiResponse::success("OK", ingredient, None)),
        None => Err(AppError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::like_prefix;

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("salt"), "salt%");
        assert_eq!(like_prefix("100%_pure"), "100\\%\\_pure%");
        assert_eq!(like_prefix("a\\b"), "a\\\\b%");
        assert_eq!(like_prefix(""), "%");
    }
}
