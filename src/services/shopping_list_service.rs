use chrono::{NaiveDate, Utc};
use sqlx::FromRow;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    state::AppState,
};

pub const APP_NAME: &str = "Foodgram";

/// One aggregated line of the manifest: the same ingredient appearing in
/// several cart recipes is merged and its amounts summed.
#[derive(Debug, PartialEq, Eq, FromRow)]
pub struct ManifestItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

#[derive(Debug)]
pub struct ShoppingManifest {
    pub filename: String,
    pub body: String,
}

/// Aggregate the requesting user's cart into a downloadable text manifest.
/// Read-only; fails with `EmptyCart` when no cart entries exist.
pub async fn build_shopping_manifest(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ShoppingManifest> {
    let cart_size: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shopping_cart WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;
    if cart_size.0 == 0 {
        return Err(AppError::EmptyCart);
    }

    // Grouped by ingredient identity (name, unit), not by join row, so
    // duplicates across recipes collapse into one summed line. The sum is
    // widened to BIGINT; name order keeps the output reproducible.
    let items = sqlx::query_as::<_, ManifestItem>(
        r#"
        SELECT i.name, i.measurement_unit, SUM(ri.amount)::BIGINT AS total_amount
        FROM shopping_cart sc
        JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let date = Utc::now().date_naive();
    Ok(ShoppingManifest {
        filename: format!("{date}-shopping-list.txt"),
        body: render_manifest(date, &items),
    })
}

/// Render the manifest text: a dated header, a blank line, then one line
/// per aggregated ingredient.
pub fn render_manifest(date: NaiveDate, items: &[ManifestItem]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 2);
    lines.push(format!("{APP_NAME}: {date}"));
    lines.push(String::new());
    for item in items {
        lines.push(format!(
            "- {} ({}) - {}",
            item.name, item.measurement_unit, item.total_amount
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, total: i64) -> ManifestItem {
        ManifestItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount: total,
        }
    }

    #[test]
    fn renders_header_blank_line_and_items() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let items = [item("Tomato", "pcs", 5), item("Salt", "g", 10)];
        let text = render_manifest(date, &items);
        assert_eq!(
            text,
            "Foodgram: 2024-03-01\n\n- Tomato (pcs) - 5\n- Salt (g) - 10"
        );
    }

    #[test]
    fn renders_empty_item_list_as_header_only() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let text = render_manifest(date, &[]);
        assert_eq!(text, "Foodgram: 2024-03-01\n");
    }

    #[test]
    fn filename_embeds_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(format!("{date}-shopping-list.txt"), "2024-12-31-shopping-list.txt");
    }
}
