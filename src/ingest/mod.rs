//! Import of the scraper's JSON export into the record store.
//!
//! Numeric calorie and nutrient values are extracted here, once, so queries
//! never re-parse raw text.

use crate::db::{categories, ingredients, recipes, tags, DbPool};
use crate::db::models::{IngredientWithQuantity, NewRecipe, NutrientMap, NutrientValue};
use crate::error::Result;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct ExportEntry {
    #[serde(rename = "Recipe")]
    recipe: ExportRecipe,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExportRecipe {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Url")]
    url: String,
    #[serde(rename = "Makes")]
    makes: String,
    #[serde(rename = "Calories")]
    calories: String,
    #[serde(rename = "Times")]
    times: ExportTimes,
    #[serde(rename = "NutrientValues")]
    nutrient_values: BTreeMap<String, String>,
    #[serde(rename = "Ingredients")]
    ingredients: Vec<ExportIngredient>,
    #[serde(rename = "Tags")]
    tags: Vec<String>,
    #[serde(rename = "Categories")]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExportTimes {
    #[serde(rename = "SoakingTime")]
    soaking_time: String,
    #[serde(rename = "PreparationTime")]
    preparation_time: String,
    #[serde(rename = "CookingTime")]
    cooking_time: String,
    #[serde(rename = "BakingTime")]
    baking_time: String,
    #[serde(rename = "BakingTemperature")]
    baking_temperature: String,
    #[serde(rename = "SproutingTime")]
    sprouting_time: String,
    #[serde(rename = "TotalTime")]
    total_time: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExportIngredient {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Quantity")]
    quantity: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Extract the leading numeric token from strings like "108 calories",
/// "4012 Cal" or "11.2 g".
pub fn parse_leading_number(text: &str) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"([\d.]+)").expect("valid regex"));
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn none_if_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse each raw nutrient string once, keeping the raw text alongside the
/// extracted value.
fn parse_nutrients(raw: BTreeMap<String, String>) -> NutrientMap {
    raw.into_iter()
        .map(|(key, value)| {
            let parsed = parse_leading_number(&value);
            (key, NutrientValue { raw: value, value: parsed })
        })
        .collect()
}

/// Import all recipes from a JSON export file. Duplicate source URLs and
/// entries without a name or url are counted as skipped, never as errors.
pub async fn import_recipes(pool: &DbPool, path: impl AsRef<Path>) -> Result<ImportReport> {
    let data = tokio::fs::read_to_string(path.as_ref()).await?;
    let entries: Vec<ExportEntry> = serde_json::from_str(&data)?;

    info!("Importing {} recipes from {:?}", entries.len(), path.as_ref());

    let mut report = ImportReport::default();

    for entry in entries {
        let export = entry.recipe;
        let name = export.name.trim().to_string();
        let url = export.url.trim().to_string();

        if name.is_empty() || url.is_empty() {
            report.skipped += 1;
            continue;
        }

        let calories_numeric = parse_leading_number(&export.calories);
        let new_recipe = NewRecipe {
            name,
            url: url.clone(),
            makes: none_if_empty(export.makes),
            calories_raw: none_if_empty(export.calories),
            calories_numeric,
            soaking_time: none_if_empty(export.times.soaking_time),
            preparation_time: none_if_empty(export.times.preparation_time),
            cooking_time: none_if_empty(export.times.cooking_time),
            baking_time: none_if_empty(export.times.baking_time),
            baking_temperature: none_if_empty(export.times.baking_temperature),
            sprouting_time: none_if_empty(export.times.sprouting_time),
            total_time: none_if_empty(export.times.total_time),
            nutrient_values: parse_nutrients(export.nutrient_values),
        };

        let recipe = match recipes::create_recipe(pool, &new_recipe).await? {
            Some(recipe) => recipe,
            None => {
                // Already present (duplicate url)
                report.skipped += 1;
                continue;
            }
        };

        let ingredient_rows: Vec<IngredientWithQuantity> = export
            .ingredients
            .into_iter()
            .filter(|i| !i.name.trim().is_empty())
            .map(|i| IngredientWithQuantity {
                name: i.name.trim().to_string(),
                quantity: none_if_empty(i.quantity),
            })
            .collect();

        ingredients::add_recipe_ingredients(pool, recipe.id, &ingredient_rows).await?;
        tags::add_recipe_tags(pool, recipe.id, &export.tags).await?;
        categories::add_recipe_categories(pool, recipe.id, &export.categories).await?;

        report.imported += 1;
    }

    if report.skipped > 0 {
        warn!("Skipped {} entries (missing fields or duplicate urls)", report.skipped);
    }
    info!("Import complete: {} recipes", report.imported);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_pool, run_migrations};

    #[test]
    fn test_parse_leading_number() {
        assert_eq!(parse_leading_number("108 calories"), Some(108.0));
        assert_eq!(parse_leading_number("4012 Cal"), Some(4012.0));
        assert_eq!(parse_leading_number("11.2 g"), Some(11.2));
        assert_eq!(parse_leading_number("trace amounts"), None);
        assert_eq!(parse_leading_number(""), None);
    }

    #[tokio::test]
    async fn test_import_skips_duplicates_and_parses_nutrients() {
        let pool = init_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let export = serde_json::json!([
            {
                "Recipe": {
                    "Name": "Vegetable Pulao",
                    "Url": "https://example.com/pulao",
                    "Makes": "4 servings",
                    "Calories": "210 calories",
                    "Times": {"TotalTime": "35 mins"},
                    "NutrientValues": {"proteinContent": "6 g", "fatContent": "trace"},
                    "Ingredients": [
                        {"Name": "rice", "Quantity": "1 1/2 cups"},
                        {"Name": "peas", "Quantity": "1/2 cup"}
                    ],
                    "Tags": ["Pulao"],
                    "Categories": ["Rice Dishes"]
                }
            },
            {
                "Recipe": {
                    "Name": "Vegetable Pulao (copy)",
                    "Url": "https://example.com/pulao",
                    "Ingredients": [],
                    "Tags": [],
                    "Categories": []
                }
            },
            {
                "Recipe": {"Name": "", "Url": "https://example.com/empty"}
            }
        ]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        tokio::fs::write(&path, export.to_string()).await.unwrap();

        let report = import_recipes(&pool, &path).await.unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 2);

        let details = crate::db::recipes::get_recipe_with_details(&pool, 1).await.unwrap();
        assert_eq!(details.recipe.calories_numeric, Some(210.0));
        assert_eq!(details.ingredients.len(), 2);
        assert_eq!(details.tags, vec!["pulao".to_string()]);
        assert_eq!(details.categories, vec!["Rice Dishes".to_string()]);

        let nutrients = details.recipe.nutrient_values.unwrap();
        assert_eq!(nutrients.0["proteinContent"].value, Some(6.0));
        assert_eq!(nutrients.0["fatContent"].value, None);
    }
}
