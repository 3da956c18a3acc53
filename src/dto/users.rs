use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::recipes::RecipeShortInfo;

/// Public profile shape returned everywhere a user is embedded.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// Profile of a followed author, annotated with their recipes.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionProfile {
    #[serde(flatten)]
    pub user: UserProfile,
    pub recipes_count: i64,
    pub recipes: Vec<RecipeShortInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<UserProfile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionList {
    pub items: Vec<SubscriptionProfile>,
}
