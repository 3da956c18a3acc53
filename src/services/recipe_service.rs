use std::collections::{HashMap, HashSet};

use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        recipes::{RecipeIngredientRead, RecipeList, RecipeRead, RecipeWriteRequest},
        users::UserProfile,
    },
    entity::{
        ingredients::Column as IngredientCol,
        recipe_ingredients::{ActiveModel as RecipeIngredientActive, Column as RiCol},
        recipe_tags::{ActiveModel as RecipeTagActive, Column as RtCol},
        recipes::ActiveModel as RecipeActive,
        tags::Column as TagCol,
        Ingredients, RecipeIngredients, RecipeTags, Recipes, Tags,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Recipe, Tag, User},
    response::{ApiResponse, Meta},
    routes::params::RecipeQuery,
    state::AppState,
};

/// Payload checks that need no database access. Reference existence is
/// verified inside the write transaction.
pub fn validate_payload(payload: &RecipeWriteRequest) -> AppResult<()> {
    if payload.cooking_time < 1 {
        return Err(AppError::validation(
            "cooking_time",
            "cooking time cannot be less than 1 minute",
        ));
    }

    if payload.ingredients.is_empty() {
        return Err(AppError::validation(
            "ingredients",
            "at least one ingredient required",
        ));
    }
    let mut seen = HashSet::new();
    for item in &payload.ingredients {
        if item.amount < 1 {
            return Err(AppError::validation(
                "ingredients",
                "amount cannot be less than 1",
            ));
        }
        if !seen.insert(item.id) {
            return Err(AppError::validation(
                "ingredients",
                "ingredients must not repeat",
            ));
        }
    }

    if payload.tags.is_empty() {
        return Err(AppError::validation("tags", "at least one tag required"));
    }
    let unique_tags: HashSet<_> = payload.tags.iter().collect();
    if unique_tags.len() != payload.tags.len() {
        return Err(AppError::validation("tags", "tags must not repeat"));
    }

    Ok(())
}

pub async fn list_recipes(
    state: &AppState,
    viewer: Option<&AuthUser>,
    query: RecipeQuery,
) -> AppResult<ApiResponse<RecipeList>> {
    let (page, per_page, offset) = query.pagination().normalize();
    let slugs = query.tag_slugs();
    let viewer_id = viewer.map(|v| v.user_id);
    // The favorited/cart filters only mean something for an authenticated
    // viewer; otherwise they are ignored.
    let by_favorited = query.is_favorited.unwrap_or(false) && viewer_id.is_some();
    let by_cart = query.is_in_shopping_cart.unwrap_or(false) && viewer_id.is_some();

    const FILTER: &str = r#"
        WHERE ($1::uuid IS NULL OR r.author_id = $1)
          AND (cardinality($2::text[]) = 0 OR EXISTS (
                SELECT 1 FROM recipe_tags rt
                JOIN tags t ON t.id = rt.tag_id
                WHERE rt.recipe_id = r.id AND t.slug = ANY($2)))
          AND (NOT $3::bool OR EXISTS (
                SELECT 1 FROM favorite_recipes fr
                WHERE fr.recipe_id = r.id AND fr.user_id = $4))
          AND (NOT $5::bool OR EXISTS (
                SELECT 1 FROM shopping_cart sc
                WHERE sc.recipe_id = r.id AND sc.user_id = $4))
    "#;

    let rows: Vec<Recipe> = sqlx::query_as(&format!(
        "SELECT r.* FROM recipes r {FILTER} ORDER BY r.created_at DESC LIMIT $6 OFFSET $7"
    ))
    .bind(query.author)
    .bind(&slugs)
    .bind(by_favorited)
    .bind(viewer_id)
    .bind(by_cart)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM recipes r {FILTER}"))
        .bind(query.author)
        .bind(&slugs)
        .bind(by_favorited)
        .bind(viewer_id)
        .bind(by_cart)
        .fetch_one(&state.pool)
        .await?;

    let items = read_views(state, rows, viewer).await?;
    let meta = Meta::new(page, per_page, total.0);
    Ok(ApiResponse::success("OK", RecipeList { items }, Some(meta)))
}

pub async fn get_recipe(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<RecipeRead>> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let row = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    let mut views = read_views(state, vec![row], viewer).await?;
    let view = views
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("read view assembly lost the recipe")))?;
    Ok(ApiResponse::success("OK", view, None))
}

pub async fn create_recipe(
    state: &AppState,
    user: &AuthUser,
    payload: RecipeWriteRequest,
) -> AppResult<ApiResponse<RecipeRead>> {
    validate_payload(&payload)?;

    let txn = state.orm.begin().await?;
    check_references(&txn, &payload).await?;

    let recipe = RecipeActive {
        id: Set(Uuid::new_v4()),
        author_id: Set(user.user_id),
        name: Set(payload.name.clone()),
        image: Set(payload.image.clone()),
        text: Set(payload.text.clone()),
        cooking_time: Set(payload.cooking_time),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    insert_relations(&txn, recipe.id, &payload).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "recipe_create",
        Some("recipes"),
        Some(serde_json::json!({ "recipe_id": recipe.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let resp = get_recipe(state, Some(user), recipe.id).await?;
    Ok(ApiResponse::success(
        "Recipe created",
        resp.data
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("missing recipe read view")))?,
        None,
    ))
}

pub async fn update_recipe(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RecipeWriteRequest,
) -> AppResult<ApiResponse<RecipeRead>> {
    validate_payload(&payload)?;

    let existing = Recipes::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if existing.author_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let txn = state.orm.begin().await?;
    check_references(&txn, &payload).await?;

    let mut active: RecipeActive = existing.into();
    active.name = Set(payload.name.clone());
    active.image = Set(payload.image.clone());
    active.text = Set(payload.text.clone());
    active.cooking_time = Set(payload.cooking_time);
    active.update(&txn).await?;

    // Replace the whole ingredient and tag sets; partial survivors from
    // the previous sets must not remain.
    RecipeIngredients::delete_many()
        .filter(RiCol::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    RecipeTags::delete_many()
        .filter(RtCol::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    insert_relations(&txn, id, &payload).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "recipe_update",
        Some("recipes"),
        Some(serde_json::json!({ "recipe_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let resp = get_recipe(state, Some(user), id).await?;
    Ok(ApiResponse::success(
        "Recipe updated",
        resp.data
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("missing recipe read view")))?,
        None,
    ))
}

pub async fn delete_recipe(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let existing = Recipes::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if existing.author_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    // Join rows, favorites and cart entries cascade away with the recipe.
    Recipes::delete_by_id(id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "recipe_delete",
        Some("recipes"),
        Some(serde_json::json!({ "recipe_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

/// Verify every referenced ingredient and tag id exists, inside the write
/// transaction so the set cannot change under us.
async fn check_references(
    txn: &sea_orm::DatabaseTransaction,
    payload: &RecipeWriteRequest,
) -> AppResult<()> {
    let ingredient_ids: Vec<Uuid> = payload.ingredients.iter().map(|i| i.id).collect();
    let found = Ingredients::find()
        .filter(IngredientCol::Id.is_in(ingredient_ids.clone()))
        .all(txn)
        .await?;
    if found.len() != ingredient_ids.len() {
        return Err(AppError::validation(
            "ingredients",
            "unknown ingredient id",
        ));
    }

    let found_tags = Tags::find()
        .filter(TagCol::Id.is_in(payload.tags.clone()))
        .all(txn)
        .await?;
    if found_tags.len() != payload.tags.len() {
        return Err(AppError::validation("tags", "unknown tag id"));
    }

    Ok(())
}

async fn insert_relations(
    txn: &sea_orm::DatabaseTransaction,
    recipe_id: Uuid,
    payload: &RecipeWriteRequest,
) -> AppResult<()> {
    for item in &payload.ingredients {
        RecipeIngredientActive {
            id: Set(Uuid::new_v4()),
            recipe_id: Set(recipe_id),
            ingredient_id: Set(item.id),
            amount: Set(item.amount),
        }
        .insert(txn)
        .await?;
    }

    for tag_id in &payload.tags {
        RecipeTagActive {
            id: Set(Uuid::new_v4()),
            recipe_id: Set(recipe_id),
            tag_id: Set(*tag_id),
        }
        .insert(txn)
        .await?;
    }

    Ok(())
}

#[derive(FromRow)]
struct RecipeIngredientRow {
    recipe_id: Uuid,
    id: Uuid,
    name: String,
    measurement_unit: String,
    amount: i32,
}

#[derive(FromRow)]
struct RecipeTagRow {
    recipe_id: Uuid,
    id: Uuid,
    name: String,
    color: String,
    slug: String,
}

/// Assemble full read views for a page of recipe rows with a fixed number
/// of batched queries.
async fn read_views(
    state: &AppState,
    rows: Vec<Recipe>,
    viewer: Option<&AuthUser>,
) -> AppResult<Vec<RecipeRead>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let author_ids: Vec<Uuid> = rows.iter().map(|r| r.author_id).collect();

    let authors: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(&author_ids)
        .fetch_all(&state.pool)
        .await?;
    let authors: HashMap<Uuid, User> = authors.into_iter().map(|u| (u.id, u)).collect();

    let ingredient_rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        r#"
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name
        "#,
    )
    .bind(&recipe_ids)
    .fetch_all(&state.pool)
    .await?;

    let tag_rows: Vec<RecipeTagRow> = sqlx::query_as(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(&recipe_ids)
    .fetch_all(&state.pool)
    .await?;

    let (favorited, in_cart, subscribed) = match viewer {
        Some(viewer) => {
            let favorited: Vec<(Uuid,)> = sqlx::query_as(
                "SELECT recipe_id FROM favorite_recipes WHERE user_id = $1 AND recipe_id = ANY($2)",
            )
            .bind(viewer.user_id)
            .bind(&recipe_ids)
            .fetch_all(&state.pool)
            .await?;
            let in_cart: Vec<(Uuid,)> = sqlx::query_as(
                "SELECT recipe_id FROM shopping_cart WHERE user_id = $1 AND recipe_id = ANY($2)",
            )
            .bind(viewer.user_id)
            .bind(&recipe_ids)
            .fetch_all(&state.pool)
            .await?;
            let subscribed: Vec<(Uuid,)> = sqlx::query_as(
                "SELECT author_id FROM follows WHERE subscriber_id = $1 AND author_id = ANY($2)",
            )
            .bind(viewer.user_id)
            .bind(&author_ids)
            .fetch_all(&state.pool)
            .await?;
            (
                favorited.into_iter().map(|r| r.0).collect::<HashSet<_>>(),
                in_cart.into_iter().map(|r| r.0).collect::<HashSet<_>>(),
                subscribed.into_iter().map(|r| r.0).collect::<HashSet<_>>(),
            )
        }
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    let mut ingredients_by_recipe: HashMap<Uuid, Vec<RecipeIngredientRead>> = HashMap::new();
    for row in ingredient_rows {
        ingredients_by_recipe
            .entry(row.recipe_id)
            .or_default()
            .push(RecipeIngredientRead {
                id: row.id,
                name: row.name,
                measurement_unit: row.measurement_unit,
                amount: row.amount,
            });
    }

    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for row in tag_rows {
        tags_by_recipe.entry(row.recipe_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
            color: row.color,
            slug: row.slug,
        });
    }

    let mut views = Vec::with_capacity(rows.len());
    for recipe in rows {
        let author = authors
            .get(&recipe.author_id)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("recipe author row missing")))?;
        views.push(RecipeRead {
            id: recipe.id,
            tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
            author: UserProfile {
                id: author.id,
                email: author.email.clone(),
                username: author.username.clone(),
                first_name: author.first_name.clone(),
                last_name: author.last_name.clone(),
                is_subscribed: subscribed.contains(&author.id),
            },
            ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
            is_favorited: favorited.contains(&recipe.id),
            is_in_shopping_cart: in_cart.contains(&recipe.id),
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        });
    }

    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::recipes::IngredientAmount;

    fn payload() -> RecipeWriteRequest {
        RecipeWriteRequest {
            name: "Borscht".into(),
            image: "recipes/borscht.png".into(),
            text: "Simmer everything".into(),
            cooking_time: 60,
            ingredients: vec![
                IngredientAmount {
                    id: Uuid::new_v4(),
                    amount: 2,
                },
                IngredientAmount {
                    id: Uuid::new_v4(),
                    amount: 3,
                },
            ],
            tags: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn accepts_well_formed_payload() {
        assert!(validate_payload(&payload()).is_ok());
    }

    #[test]
    fn rejects_empty_ingredient_list() {
        let mut p = payload();
        p.ingredients.clear();
        let err = validate_payload(&p).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation {
                field: "ingredients",
                ..
            }
        ));
    }

    #[test]
    fn rejects_duplicate_ingredient_ids() {
        let mut p = payload();
        let dup = p.ingredients[0].clone();
        p.ingredients.push(dup);
        let err = validate_payload(&p).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation {
                field: "ingredients",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_amount() {
        let mut p = payload();
        p.ingredients[0].amount = 0;
        assert!(validate_payload(&p).is_err());
    }

    #[test]
    fn rejects_duplicate_and_missing_tags() {
        let mut p = payload();
        p.tags.push(p.tags[0]);
        assert!(validate_payload(&p).is_err());

        let mut p = payload();
        p.tags.clear();
        assert!(validate_payload(&p).is_err());
    }

    #[test]
    fn rejects_zero_cooking_time() {
        let mut p = payload();
        p.cooking_time = 0;
        let err = validate_payload(&p).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation {
                field: "cooking_time",
                ..
            }
        ));
    }
}
