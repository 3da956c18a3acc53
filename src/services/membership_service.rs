use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::recipes::RecipeShortInfo,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// The favorites and the shopping cart share the same membership shape:
/// at most one (user, recipe) row per relation, created and deleted but
/// never updated. The kind selects the backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipKind {
    Favorite,
    Cart,
}

impl MembershipKind {
    fn table(self) -> &'static str {
        match self {
            MembershipKind::Favorite => "favorite_recipes",
            MembershipKind::Cart => "shopping_cart",
        }
    }

    fn audit_action(self, op: &str) -> String {
        match self {
            MembershipKind::Favorite => format!("favorite_{op}"),
            MembershipKind::Cart => format!("cart_{op}"),
        }
    }
}

pub async fn add_membership(
    state: &AppState,
    kind: MembershipKind,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<RecipeShortInfo>> {
    // The existence pre-check gives a precise message; the unique
    // constraint below is the authoritative guard under concurrency.
    let existing: Option<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user.user_id)
    .bind(recipe_id)
    .fetch_optional(&state.pool)
    .await?;

    if existing.is_some() {
        return Err(AppError::AlreadyExists("already added".into()));
    }

    let recipe: Option<RecipeShortInfo> =
        sqlx::query_as("SELECT id, image, name, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(&state.pool)
            .await?;
    let recipe = match recipe {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    let inserted = sqlx::query(&format!(
        "INSERT INTO {} (id, user_id, recipe_id) VALUES ($1, $2, $3)",
        kind.table()
    ))
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(recipe_id)
    .execute(&state.pool)
    .await;

    if let Err(err) = inserted {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Err(AppError::AlreadyExists("already added".into()));
            }
        }
        return Err(err.into());
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        &kind.audit_action("add"),
        Some(kind.table()),
        Some(serde_json::json!({ "recipe_id": recipe_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Added", recipe, Some(Meta::empty())))
}

pub async fn remove_membership(
    state: &AppState,
    kind: MembershipKind,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<()> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user.user_id)
    .bind(recipe_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "does not exist or was already removed".into(),
        ));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        &kind.audit_action("remove"),
        Some(kind.table()),
        Some(serde_json::json!({ "recipe_id": recipe_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}
