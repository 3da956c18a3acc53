use uuid::Uuid;

use crate::{
    dto::users::{UserList, UserProfile},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    match row {
        Some(row) => Ok(ApiResponse::success("OK", profile(row, false), None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn get_user(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<UserProfile>> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let row = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    let is_subscribed = match viewer {
        Some(viewer) => {
            let follow: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM follows WHERE subscriber_id = $1 AND author_id = $2",
            )
            .bind(viewer.user_id)
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
            follow.is_some()
        }
        None => false,
    };

    Ok(ApiResponse::success("OK", profile(row, is_subscribed), None))
}

pub async fn list_users(
    state: &AppState,
    viewer: Option<&AuthUser>,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    let (page, per_page, offset) = pagination.normalize();

    let rows: Vec<User> =
        sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(per_page)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.pool)
        .await?;

    let subscribed: Vec<Uuid> = match viewer {
        Some(viewer) => {
            let rows: Vec<(Uuid,)> =
                sqlx::query_as("SELECT author_id FROM follows WHERE subscriber_id = $1")
                    .bind(viewer.user_id)
                    .fetch_all(&state.pool)
                    .await?;
            rows.into_iter().map(|r| r.0).collect()
        }
        None => Vec::new(),
    };

    let items = rows
        .into_iter()
        .map(|row| {
            let is_subscribed = subscribed.contains(&row.id);
            profile(row, is_subscribed)
        })
        .collect();

    let meta = Meta::new(page, per_page, total.0);
    Ok(ApiResponse::success("OK", UserList { items }, Some(meta)))
}

fn profile(user: User, is_subscribed: bool) -> UserProfile {
    UserProfile {
        id: user.id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
    }
}
