use crate::db::{
    models::{Category, NameCount},
    DbPool,
};
use crate::error::Result;

/// Get or create a category by name
pub async fn get_or_create_category(pool: &DbPool, name: &str) -> Result<Category> {
    let normalized = name.trim().to_string();

    let existing = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = ?")
        .bind(&normalized)
        .fetch_optional(pool)
        .await?;

    if let Some(category) = existing {
        Ok(category)
    } else {
        let category =
            sqlx::query_as::<_, Category>("INSERT INTO categories (name) VALUES (?) RETURNING *")
                .bind(&normalized)
                .fetch_one(pool)
                .await?;

        Ok(category)
    }
}

/// Add category to recipe
pub async fn add_recipe_category(pool: &DbPool, recipe_id: i64, category_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO recipe_categories (recipe_id, category_id) VALUES (?, ?)")
        .bind(recipe_id)
        .bind(category_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Add multiple categories to recipe
pub async fn add_recipe_categories(
    pool: &DbPool,
    recipe_id: i64,
    category_names: &[String],
) -> Result<()> {
    for name in category_names {
        if name.trim().is_empty() {
            continue;
        }
        let category = get_or_create_category(pool, name).await?;
        add_recipe_category(pool, recipe_id, category.id).await?;
    }

    Ok(())
}

/// Get all categories with usage count, ordered by name
pub async fn get_categories_with_count(pool: &DbPool) -> Result<Vec<NameCount>> {
    let categories = sqlx::query_as::<_, NameCount>(
        r#"
        SELECT c.name, COUNT(rc.recipe_id) as count
        FROM categories c
        JOIN recipe_categories rc ON rc.category_id = c.id
        GROUP BY c.id, c.name
        ORDER BY c.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

/// Count total categories
pub async fn count_categories(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}
