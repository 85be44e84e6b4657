//! Structured filter search over the record store.
//!
//! Every supplied criterion compiles to one boolean sub-expression and all
//! sub-expressions are ANDed into a single predicate. The count query and the
//! data query share that predicate, so `total` always describes the same row
//! set as the returned page regardless of pagination.

use crate::db::{models::RecipeSummary, tags, DbPool};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFilter {
    /// Free text; matches the recipe-name index or partially matches a tag.
    pub q: String,
    /// Every entry must match (AND semantics).
    pub include_ingredients: Vec<String>,
    /// No entry may match (AND-of-NOT semantics).
    pub exclude_ingredients: Vec<String>,
    /// Exact tag names, all required.
    pub tags: Vec<String>,
    /// Exact category name.
    pub category: String,
    pub cal_min: Option<f64>,
    pub cal_max: Option<f64>,
    /// Nutrient key for the post-filter, e.g. "proteinContent".
    pub nutrient: String,
    pub nutrient_max: Option<f64>,
    pub page: i64,
    pub page_size: i64,
}

impl Default for RecipeFilter {
    fn default() -> Self {
        RecipeFilter {
            q: String::new(),
            include_ingredients: Vec::new(),
            exclude_ingredients: Vec::new(),
            tags: Vec::new(),
            category: String::new(),
            cal_min: None,
            cal_max: None,
            nutrient: String::new(),
            nutrient_max: None,
            page: 1,
            page_size: 20,
        }
    }
}

impl RecipeFilter {
    /// Reject malformed paging before touching the datastore.
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(Error::Validation("page must be >= 1".to_string()));
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(Error::Validation(
                "page_size must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }

    fn has_nutrient_filter(&self) -> bool {
        !self.nutrient.trim().is_empty() && self.nutrient_max.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResults {
    pub recipes: Vec<RecipeSummary>,
    /// Count of rows matching the predicate, before the nutrient post-filter.
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Turn a user term into an FTS5 prefix query. Input is user-typed text, so
/// it is reduced to alphanumeric tokens and each token is double-quoted;
/// punctuation like apostrophes, hyphens or parens never reaches the MATCH
/// parser. Prefix matching applies to the last token, so "tomat" matches
/// "tomato". `None` when the term has no indexable characters.
fn fts_prefix(term: &str) -> Option<String> {
    let tokens: Vec<String> = term
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();

    if tokens.is_empty() {
        return None;
    }

    let mut expr = tokens.join(" ");
    expr.push('*');
    Some(expr)
}

// The single predicate both the count and data queries run against.
fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, filter: &RecipeFilter) {
    builder.push(" WHERE 1=1");

    let q = filter.q.trim();
    if !q.is_empty() {
        // Free text is a disjunction: name-index match OR partial tag match,
        // so one search box surfaces "recipes named X" and "recipes tagged X".
        builder.push(" AND (");
        if let Some(expr) = fts_prefix(q) {
            builder.push("r.id IN (SELECT rowid FROM recipes_fts WHERE recipes_fts MATCH ");
            builder.push_bind(expr);
            builder.push(") OR ");
        }
        builder.push(
            "r.id IN (SELECT rt.recipe_id FROM recipe_tags rt \
             JOIN tags t ON rt.tag_id = t.id WHERE t.name LIKE ",
        );
        builder.push_bind(format!("%{q}%"));
        builder.push("))");
    }

    for ing in &filter.include_ingredients {
        let Some(expr) = fts_prefix(ing) else {
            continue;
        };
        builder.push(
            " AND r.id IN (SELECT i.recipe_id FROM ingredients i \
             JOIN ingredients_fts ON ingredients_fts.rowid = i.id \
             WHERE ingredients_fts MATCH ",
        );
        builder.push_bind(expr);
        builder.push(")");
    }

    for ing in &filter.exclude_ingredients {
        let Some(expr) = fts_prefix(ing) else {
            continue;
        };
        builder.push(
            " AND r.id NOT IN (SELECT i.recipe_id FROM ingredients i \
             JOIN ingredients_fts ON ingredients_fts.rowid = i.id \
             WHERE ingredients_fts MATCH ",
        );
        builder.push_bind(expr);
        builder.push(")");
    }

    for tag in &filter.tags {
        if tag.trim().is_empty() {
            continue;
        }
        builder.push(
            " AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt \
             JOIN tags t ON rt.tag_id = t.id WHERE t.name = ",
        );
        // Tags are stored normalized (lowercase, trimmed)
        builder.push_bind(tag.trim().to_lowercase());
        builder.push(")");
    }

    let category = filter.category.trim();
    if !category.is_empty() {
        builder.push(
            " AND r.id IN (SELECT rc.recipe_id FROM recipe_categories rc \
             JOIN categories c ON rc.category_id = c.id WHERE c.name = ",
        );
        builder.push_bind(category.to_string());
        builder.push(")");
    }

    if let Some(cal_min) = filter.cal_min {
        builder.push(" AND r.calories_numeric >= ");
        builder.push_bind(cal_min);
    }

    if let Some(cal_max) = filter.cal_max {
        builder.push(" AND r.calories_numeric <= ");
        builder.push_bind(cal_max);
    }

    if filter.has_nutrient_filter() {
        // The per-key bound is applied as a post-filter over the page; here
        // we can only require that a nutrient map exists at all.
        builder.push(" AND r.nutrient_values IS NOT NULL");
    }
}

/// Execute a structured filter search: one conjunctive predicate, ordered by
/// name, paginated, with tags attached to each row.
pub async fn search_recipes(pool: &DbPool, filter: &RecipeFilter) -> Result<FilterResults> {
    filter.validate()?;

    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_predicate(&mut count_query, filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut data_query = QueryBuilder::new(
        "SELECT r.id, r.name, r.url, r.makes, r.calories_raw, r.calories_numeric, \
         r.total_time, r.nutrient_values FROM recipes r",
    );
    push_predicate(&mut data_query, filter);
    data_query.push(" ORDER BY r.name, r.id LIMIT ");
    data_query.push_bind(filter.page_size);
    data_query.push(" OFFSET ");
    data_query.push_bind((filter.page - 1) * filter.page_size);

    let mut recipes: Vec<RecipeSummary> = data_query.build_query_as().fetch_all(pool).await?;

    let recipe_ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let mut tags_map = tags::get_tags_for_recipes(pool, &recipe_ids).await?;
    for recipe in &mut recipes {
        recipe.tags = tags_map.remove(&recipe.id).unwrap_or_default();
    }

    // Nutrient bound applies after pagination; the page may shrink below
    // page_size while `total` keeps describing the predicate. See DESIGN.md.
    if filter.has_nutrient_filter() {
        let key = filter.nutrient.trim();
        let max = filter.nutrient_max.unwrap_or(f64::MAX);
        recipes.retain(|r| matches!(r.nutrient_value(key), Some(v) if v <= max));
    }

    Ok(FilterResults {
        recipes,
        total,
        page: filter.page,
        page_size: filter.page_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fts_prefix_quotes_tokens() {
        assert_eq!(fts_prefix("tomat").unwrap(), "\"tomat\"*");
        assert_eq!(fts_prefix("  green peas ").unwrap(), "\"green\" \"peas\"*");
        assert_eq!(fts_prefix("\"garlic\"").unwrap(), "\"garlic\"*");
    }

    #[test]
    fn test_fts_prefix_neutralizes_operator_characters() {
        assert_eq!(fts_prefix("shepherd's pie").unwrap(), "\"shepherd\" \"s\" \"pie\"*");
        assert_eq!(fts_prefix("gluten-free").unwrap(), "\"gluten\" \"free\"*");
        assert_eq!(fts_prefix("rice (easy)").unwrap(), "\"rice\" \"easy\"*");
        assert_eq!(fts_prefix("NOT OR AND").unwrap(), "\"NOT\" \"OR\" \"AND\"*");
        assert_eq!(fts_prefix("?!*"), None);
        assert_eq!(fts_prefix("   "), None);
    }

    #[test]
    fn test_filter_validation() {
        let mut filter = RecipeFilter::default();
        assert!(filter.validate().is_ok());

        filter.page = 0;
        assert!(filter.validate().is_err());

        filter.page = 1;
        filter.page_size = 101;
        assert!(filter.validate().is_err());

        filter.page_size = 0;
        assert!(filter.validate().is_err());
    }
}
