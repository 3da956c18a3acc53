use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::users::UserProfile, models::Tag};

/// One ingredient reference in a recipe write payload.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Write view for both create and update; ingredient and tag lists are
/// always replaced as a whole.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecipeWriteRequest {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
}

/// Ingredient row as rendered inside a recipe read view.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct RecipeIngredientRead {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full read view of a recipe.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeRead {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientRead>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Short summary echoed by the favorite/cart toggles and subscription
/// profiles.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct RecipeShortInfo {
    pub id: Uuid,
    pub image: String,
    pub name: String,
    pub cooking_time: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeList {
    pub items: Vec<RecipeRead>,
}
