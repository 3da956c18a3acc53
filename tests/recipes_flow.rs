use axum_foodgram_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::recipes::{IngredientAmount, RecipeWriteRequest},
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{Pagination, RecipesLimit},
    services::{
        membership_service::{self, MembershipKind},
        recipe_service, shopping_list_service, subscription_service,
    },
    state::AppState,
};
use uuid::Uuid;

// Integration flow: two authors publish recipes; a user favorites, fills the
// cart, downloads the aggregated list, and follows an author.
#[tokio::test]
async fn favorites_cart_manifest_and_subscription_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let author_id = create_user(&state, "author@example.com", "author").await?;
    let reader_id = create_user(&state, "reader@example.com", "reader").await?;
    let author = AuthUser {
        user_id: author_id,
        role: "user".into(),
    };
    let reader = AuthUser {
        user_id: reader_id,
        role: "user".into(),
    };

    let tag_id = create_tag(&state, "Dinner", "#8775D2", "dinner").await?;
    let tomato = create_ingredient(&state, "Tomato", "pcs").await?;
    let salt = create_ingredient(&state, "Salt", "g").await?;
    let egg = create_ingredient(&state, "Egg", "pcs").await?;

    // Recipe A: Tomato x2. Recipe B: Tomato x3 + Salt x10.
    let recipe_a = create_recipe(
        &state,
        &author,
        "Tomato soup",
        tag_id,
        vec![(tomato, 2)],
    )
    .await?;
    let recipe_b = create_recipe(
        &state,
        &author,
        "Salted tomatoes",
        tag_id,
        vec![(tomato, 3), (salt, 10)],
    )
    .await?;

    // Favorite toggle is idempotence-guarded: second add fails, second
    // remove fails.
    let added =
        membership_service::add_membership(&state, MembershipKind::Favorite, &reader, recipe_a)
            .await?;
    assert_eq!(added.data.unwrap().id, recipe_a);

    let dup =
        membership_service::add_membership(&state, MembershipKind::Favorite, &reader, recipe_a)
            .await;
    assert!(matches!(dup, Err(AppError::AlreadyExists(_))));

    let missing = membership_service::add_membership(
        &state,
        MembershipKind::Favorite,
        &reader,
        Uuid::new_v4(),
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    membership_service::remove_membership(&state, MembershipKind::Favorite, &reader, recipe_a)
        .await?;
    let gone =
        membership_service::remove_membership(&state, MembershipKind::Favorite, &reader, recipe_a)
            .await;
    assert!(matches!(gone, Err(AppError::BadRequest(_))));

    // Empty cart refuses to produce a manifest.
    let empty = shopping_list_service::build_shopping_manifest(&state, &reader).await;
    assert!(matches!(empty, Err(AppError::EmptyCart)));

    // Cart with both recipes: Tomato merges into a single summed line.
    membership_service::add_membership(&state, MembershipKind::Cart, &reader, recipe_a).await?;
    membership_service::add_membership(&state, MembershipKind::Cart, &reader, recipe_b).await?;

    let manifest = shopping_list_service::build_shopping_manifest(&state, &reader).await?;
    assert!(manifest.filename.ends_with("-shopping-list.txt"));
    assert!(manifest.body.starts_with("Foodgram: "));
    let tomato_lines: Vec<&str> = manifest
        .body
        .lines()
        .filter(|l| l.contains("Tomato"))
        .collect();
    assert_eq!(tomato_lines, vec!["- Tomato (pcs) - 5"]);
    assert!(manifest.body.contains("- Salt (g) - 10"));

    // Duplicate ingredient ids are rejected before anything is written.
    let recipes_before: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(&state.pool)
        .await?;
    let invalid = recipe_service::create_recipe(
        &state,
        &author,
        write_request("Broken", tag_id, vec![(tomato, 1), (tomato, 2)]),
    )
    .await;
    assert!(matches!(
        invalid,
        Err(AppError::Validation {
            field: "ingredients",
            ..
        })
    ));
    let recipes_after: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(recipes_before, recipes_after);

    // Updating replaces the whole ingredient set, even when it overlaps.
    recipe_service::update_recipe(
        &state,
        &author,
        recipe_b,
        write_request("Salted tomatoes v2", tag_id, vec![(tomato, 4), (egg, 1)]),
    )
    .await?;
    let mut rows: Vec<(Uuid, i32)> = sqlx::query_as(
        "SELECT ingredient_id, amount FROM recipe_ingredients WHERE recipe_id = $1",
    )
    .bind(recipe_b)
    .fetch_all(&state.pool)
    .await?;
    rows.sort();
    let mut expected = vec![(tomato, 4), (egg, 1)];
    expected.sort();
    assert_eq!(rows, expected);

    // The updated amounts flow straight into the manifest.
    let manifest = shopping_list_service::build_shopping_manifest(&state, &reader).await?;
    assert!(manifest.body.contains("- Tomato (pcs) - 6"));
    assert!(manifest.body.contains("- Egg (pcs) - 1"));
    assert!(!manifest.body.contains("Salt"));

    // Subscriptions: no self-follow, no double follow, symmetric removal.
    let selfie =
        subscription_service::subscribe(&state, &reader, reader_id, RecipesLimit::default()).await;
    assert!(matches!(selfie, Err(AppError::SelfFollow)));

    let followed = subscription_service::subscribe(
        &state,
        &reader,
        author_id,
        RecipesLimit {
            recipes_limit: Some(1),
        },
    )
    .await?;
    let profile = followed.data.unwrap();
    assert_eq!(profile.user.id, author_id);
    assert_eq!(profile.recipes_count, 2);
    assert_eq!(profile.recipes.len(), 1);

    let dup =
        subscription_service::subscribe(&state, &reader, author_id, RecipesLimit::default()).await;
    assert!(matches!(dup, Err(AppError::AlreadyExists(_))));

    let subs = subscription_service::list_subscriptions(
        &state,
        &reader,
        Pagination {
            page: Some(1),
            per_page: Some(20),
        },
        RecipesLimit::default(),
    )
    .await?;
    let subs = subs.data.unwrap();
    assert_eq!(subs.items.len(), 1);
    assert_eq!(subs.items[0].recipes.len(), 2);

    subscription_service::unsubscribe(&state, &reader, author_id).await?;
    let gone = subscription_service::unsubscribe(&state, &reader, author_id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE follows, shopping_cart, favorite_recipes, recipe_tags, \
         recipe_ingredients, recipes, audit_logs, ingredients, tags, users \
         RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(state: &AppState, email: &str, username: &str) -> anyhow::Result<Uuid> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, username, first_name, last_name, password_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(username)
    .bind("Test")
    .bind("User")
    .bind("dummy")
    .fetch_one(&state.pool)
    .await?;
    Ok(row.0)
}

async fn create_tag(
    state: &AppState,
    name: &str,
    color: &str,
    slug: &str,
) -> anyhow::Result<Uuid> {
    let row: (Uuid,) =
        sqlx::query_as("INSERT INTO tags (id, name, color, slug) VALUES ($1, $2, $3, $4) RETURNING id")
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(color)
            .bind(slug)
            .fetch_one(&state.pool)
            .await?;
    Ok(row.0)
}

async fn create_ingredient(state: &AppState, name: &str, unit: &str) -> anyhow::Result<Uuid> {
    let row: (Uuid,) = sqlx::query_as(
        "INSERT INTO ingredients (id, name, measurement_unit) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(unit)
    .fetch_one(&state.pool)
    .await?;
    Ok(row.0)
}

fn write_request(name: &str, tag_id: Uuid, ingredients: Vec<(Uuid, i32)>) -> RecipeWriteRequest {
    RecipeWriteRequest {
        name: name.to_string(),
        image: format!("recipes/{name}.png"),
        text: "Cook it well".to_string(),
        cooking_time: 30,
        ingredients: ingredients
            .into_iter()
            .map(|(id, amount)| IngredientAmount { id, amount })
            .collect(),
        tags: vec![tag_id],
    }
}

async fn create_recipe(
    state: &AppState,
    author: &AuthUser,
    name: &str,
    tag_id: Uuid,
    ingredients: Vec<(Uuid, i32)>,
) -> anyhow::Result<Uuid> {
    let resp =
        recipe_service::create_recipe(state, author, write_request(name, tag_id, ingredients))
            .await?;
    Ok(resp.data.expect("created recipe read view").id)
}
