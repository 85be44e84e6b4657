use crate::db::{models::IngredientWithQuantity, DbPool};
use crate::error::Result;

/// Add an ingredient row to a recipe. Quantity stays opaque text
/// ("1 1/2 cups"); no unit parsing happens here.
pub async fn add_recipe_ingredient(
    pool: &DbPool,
    recipe_id: i64,
    name: &str,
    quantity: Option<&str>,
) -> Result<()> {
    sqlx::query("INSERT INTO ingredients (recipe_id, name, quantity) VALUES (?, ?, ?)")
        .bind(recipe_id)
        .bind(name.trim())
        .bind(quantity)
        .execute(pool)
        .await?;

    Ok(())
}

/// Add multiple ingredients to a recipe
pub async fn add_recipe_ingredients(
    pool: &DbPool,
    recipe_id: i64,
    ingredients: &[IngredientWithQuantity],
) -> Result<()> {
    for ing in ingredients {
        add_recipe_ingredient(pool, recipe_id, &ing.name, ing.quantity.as_deref()).await?;
    }

    Ok(())
}

/// Get ingredients for a recipe
pub async fn get_ingredients_for_recipe(
    pool: &DbPool,
    recipe_id: i64,
) -> Result<Vec<IngredientWithQuantity>> {
    let ingredients = sqlx::query_as::<_, IngredientWithQuantity>(
        "SELECT name, quantity FROM ingredients WHERE recipe_id = ? ORDER BY id",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(ingredients)
}

/// Count total ingredient rows
pub async fn count_ingredients(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}
