use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        recipes::RecipeShortInfo,
        users::{SubscriptionList, SubscriptionProfile, UserProfile},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, RecipesLimit},
    state::AppState,
};

pub async fn subscribe(
    state: &AppState,
    user: &AuthUser,
    author_id: Uuid,
    limit: RecipesLimit,
) -> AppResult<ApiResponse<SubscriptionProfile>> {
    if user.user_id == author_id {
        return Err(AppError::SelfFollow);
    }

    let author: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(author_id)
        .fetch_optional(&state.pool)
        .await?;
    let author = match author {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM follows WHERE subscriber_id = $1 AND author_id = $2")
            .bind(user.user_id)
            .bind(author_id)
            .fetch_optional(&state.pool)
            .await?;
    if existing.is_some() {
        return Err(AppError::AlreadyExists("already subscribed".into()));
    }

    let inserted = sqlx::query("INSERT INTO follows (id, subscriber_id, author_id) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(author_id)
        .execute(&state.pool)
        .await;

    if let Err(err) = inserted {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Err(AppError::AlreadyExists("already subscribed".into()));
            }
        }
        return Err(err.into());
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "subscribe",
        Some("follows"),
        Some(serde_json::json!({ "author_id": author_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let profile = subscription_profile(state, author, limit.normalized()).await?;
    Ok(ApiResponse::success(
        "Subscribed",
        profile,
        Some(Meta::empty()),
    ))
}

pub async fn unsubscribe(state: &AppState, user: &AuthUser, author_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM follows WHERE subscriber_id = $1 AND author_id = $2")
        .bind(user.user_id)
        .bind(author_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "unsubscribe",
        Some("follows"),
        Some(serde_json::json!({ "author_id": author_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

pub async fn list_subscriptions(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    limit: RecipesLimit,
) -> AppResult<ApiResponse<SubscriptionList>> {
    let (page, per_page, offset) = pagination.normalize();

    let authors: Vec<User> = sqlx::query_as(
        r#"
        SELECT u.*
        FROM follows f
        JOIN users u ON u.id = f.author_id
        WHERE f.subscriber_id = $1
        ORDER BY f.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE subscriber_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let mut items = Vec::with_capacity(authors.len());
    for author in authors {
        items.push(subscription_profile(state, author, limit.normalized()).await?);
    }

    let meta = Meta::new(page, per_page, total.0);
    Ok(ApiResponse::success(
        "OK",
        SubscriptionList { items },
        Some(meta),
    ))
}

/// Author profile annotated with their recipe count and a capped recipe
/// list; `recipes_limit = None` means all.
async fn subscription_profile(
    state: &AppState,
    author: User,
    recipes_limit: Option<i64>,
) -> AppResult<SubscriptionProfile> {
    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author.id)
        .fetch_one(&state.pool)
        .await?;

    let recipes: Vec<RecipeShortInfo> = sqlx::query_as(
        r#"
        SELECT id, image, name, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(author.id)
    .bind(recipes_limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(SubscriptionProfile {
        user: UserProfile {
            id: author.id,
            email: author.email,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            is_subscribed: true,
        },
        recipes_count: recipes_count.0,
        recipes,
    })
}
