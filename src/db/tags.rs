use crate::db::{
    models::{NameCount, Tag},
    DbPool,
};
use crate::error::Result;

/// Get or create a tag by name
pub async fn get_or_create_tag(pool: &DbPool, name: &str) -> Result<Tag> {
    // Normalize tag name (lowercase, trim)
    let normalized = name.trim().to_lowercase();

    let existing = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = ?")
        .bind(&normalized)
        .fetch_optional(pool)
        .await?;

    if let Some(tag) = existing {
        Ok(tag)
    } else {
        let tag = sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES (?) RETURNING *")
            .bind(&normalized)
            .fetch_one(pool)
            .await?;

        Ok(tag)
    }
}

/// Add tag to recipe
pub async fn add_recipe_tag(pool: &DbPool, recipe_id: i64, tag_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
        .bind(recipe_id)
        .bind(tag_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Add multiple tags to recipe
pub async fn add_recipe_tags(pool: &DbPool, recipe_id: i64, tag_names: &[String]) -> Result<()> {
    for tag_name in tag_names {
        if tag_name.trim().is_empty() {
            continue;
        }
        let tag = get_or_create_tag(pool, tag_name).await?;
        add_recipe_tag(pool, recipe_id, tag.id).await?;
    }

    Ok(())
}

/// Get tag names for a recipe
pub async fn get_tags_for_recipe(pool: &DbPool, recipe_id: i64) -> Result<Vec<String>> {
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

    Ok(tags)
}

/// Get tags for multiple recipes in a single query (batch loading to avoid N+1)
pub async fn get_tags_for_recipes(
    pool: &DbPool,
    recipe_ids: &[i64],
) -> Result<std::collections::HashMap<i64, Vec<String>>> {
    use std::collections::HashMap;

    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; recipe_ids.len()].join(",");
    let query_str = format!(
        r#"
        SELECT rt.recipe_id, t.name
        FROM recipe_tags rt
        JOIN tags t ON rt.tag_id = t.id
        WHERE rt.recipe_id IN ({placeholders})
        ORDER BY rt.recipe_id, t.name
        "#
    );

    let mut query = sqlx::query_as::<_, (i64, String)>(&query_str);
    for id in recipe_ids {
        query = query.bind(id);
    }

    let results: Vec<(i64, String)> = query.fetch_all(pool).await?;

    let mut tags_map: HashMap<i64, Vec<String>> = HashMap::new();
    for (recipe_id, tag_name) in results {
        tags_map.entry(recipe_id).or_default().push(tag_name);
    }

    // Ensure all recipe_ids have an entry (even if empty)
    for &recipe_id in recipe_ids {
        tags_map.entry(recipe_id).or_default();
    }

    Ok(tags_map)
}

/// Get all tags with usage count, most used first
pub async fn get_tags_with_count(pool: &DbPool) -> Result<Vec<NameCount>> {
    let tags = sqlx::query_as::<_, NameCount>(
        r#"
        SELECT t.name, COUNT(rt.recipe_id) as count
        FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.id
        GROUP BY t.id, t.name
        ORDER BY count DESC, t.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(tags)
}

/// Count total tags
pub async fn count_tags(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}
