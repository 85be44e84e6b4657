use crate::db::{models::*, DbPool};
use crate::error::{Error, Result};
use sqlx::types::Json;

/// Create a new recipe. A duplicate source URL means the recipe was already
/// ingested; it is skipped, not an error.
pub async fn create_recipe(pool: &DbPool, new_recipe: &NewRecipe) -> Result<Option<Recipe>> {
    // An empty nutrient map is stored as NULL so "has nutrition data" is a
    // plain column check.
    let nutrients = if new_recipe.nutrient_values.is_empty() {
        None
    } else {
        Some(Json(&new_recipe.nutrient_values))
    };

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (
            name, url, makes, calories_raw, calories_numeric,
            soaking_time, preparation_time, cooking_time, baking_time,
            baking_temperature, sprouting_time, total_time, nutrient_values
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(url) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&new_recipe.name)
    .bind(&new_recipe.url)
    .bind(&new_recipe.makes)
    .bind(&new_recipe.calories_raw)
    .bind(new_recipe.calories_numeric)
    .bind(&new_recipe.soaking_time)
    .bind(&new_recipe.preparation_time)
    .bind(&new_recipe.cooking_time)
    .bind(&new_recipe.baking_time)
    .bind(&new_recipe.baking_temperature)
    .bind(&new_recipe.sprouting_time)
    .bind(&new_recipe.total_time)
    .bind(nutrients)
    .fetch_optional(pool)
    .await?;

    Ok(recipe)
}

/// Get recipe by ID
pub async fn get_recipe(pool: &DbPool, recipe_id: i64) -> Result<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} not found")))?;

    Ok(recipe)
}

/// Get recipe with all details (ingredients, tags, categories)
pub async fn get_recipe_with_details(pool: &DbPool, recipe_id: i64) -> Result<RecipeDetails> {
    let recipe = get_recipe(pool, recipe_id).await?;

    let ingredients: Vec<IngredientWithQuantity> = sqlx::query_as(
        "SELECT name, quantity FROM ingredients WHERE recipe_id = ? ORDER BY id",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    let tags: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT t.name
        FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE rt.recipe_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    let categories: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT c.name
        FROM categories c
        JOIN recipe_categories rc ON rc.category_id = c.id
        WHERE rc.recipe_id = ?
        ORDER BY c.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(RecipeDetails {
        recipe,
        ingredients,
        tags,
        categories,
    })
}

/// List every recipe as a flat record for the indexing job (name, ingredient
/// names, tag names).
pub async fn list_indexable_recipes(pool: &DbPool) -> Result<Vec<IndexableRecipe>> {
    let rows: Vec<(i64, String, String)> = sqlx::query_as("SELECT id, name, url FROM recipes")
        .fetch_all(pool)
        .await?;

    let ids: Vec<i64> = rows.iter().map(|(id, _, _)| *id).collect();
    let mut ingredients_map = batch_names(
        pool,
        &ids,
        "SELECT recipe_id, name FROM ingredients WHERE recipe_id IN",
    )
    .await?;
    let mut tags_map = batch_names(
        pool,
        &ids,
        "SELECT rt.recipe_id, t.name FROM recipe_tags rt JOIN tags t ON rt.tag_id = t.id WHERE rt.recipe_id IN",
    )
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, url)| IndexableRecipe {
            id,
            name,
            url,
            ingredients: ingredients_map.remove(&id).unwrap_or_default(),
            tags: tags_map.remove(&id).unwrap_or_default(),
        })
        .collect())
}

// Batch child-name lookup grouped by recipe id (avoids N+1 queries).
async fn batch_names(
    pool: &DbPool,
    recipe_ids: &[i64],
    query_prefix: &str,
) -> Result<std::collections::HashMap<i64, Vec<String>>> {
    use std::collections::HashMap;

    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; recipe_ids.len()].join(",");
    let query_str = format!("{query_prefix} ({placeholders})");

    let mut query = sqlx::query_as::<_, (i64, String)>(&query_str);
    for id in recipe_ids {
        query = query.bind(id);
    }

    let rows: Vec<(i64, String)> = query.fetch_all(pool).await?;

    let mut map: HashMap<i64, Vec<String>> = HashMap::new();
    for (recipe_id, name) in rows {
        map.entry(recipe_id).or_default().push(name);
    }

    Ok(map)
}

/// Count all recipes
pub async fn count_all_recipes(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Delete recipe (child rows cascade)
pub async fn delete_recipe(pool: &DbPool, recipe_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .execute(pool)
        .await?;

    Ok(())
}
