pub mod auth_service;
pub mod catalog_service;
pub mod membership_service;
pub mod recipe_service;
pub mod shopping_list_service;
pub mod subscription_service;
pub mod user_service;
