use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;

/// One entry of a recipe's sparse nutrient map. The numeric value is parsed
/// from the raw text once at ingestion; `None` means no leading number could
/// be extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientValue {
    pub raw: String,
    pub value: Option<f64>,
}

pub type NutrientMap = BTreeMap<String, NutrientValue>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub makes: Option<String>,
    pub calories_raw: Option<String>,
    pub calories_numeric: Option<f64>,
    pub soaking_time: Option<String>,
    pub preparation_time: Option<String>,
    pub cooking_time: Option<String>,
    pub baking_time: Option<String>,
    pub baking_temperature: Option<String>,
    pub sprouting_time: Option<String>,
    pub total_time: Option<String>,
    pub nutrient_values: Option<Json<NutrientMap>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub url: String,
    pub makes: Option<String>,
    pub calories_raw: Option<String>,
    pub calories_numeric: Option<f64>,
    pub soaking_time: Option<String>,
    pub preparation_time: Option<String>,
    pub cooking_time: Option<String>,
    pub baking_time: Option<String>,
    pub baking_temperature: Option<String>,
    pub sprouting_time: Option<String>,
    pub total_time: Option<String>,
    pub nutrient_values: NutrientMap,
}

/// Slim row returned by the filter search; tags are attached after the
/// page query via a batch lookup.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub makes: Option<String>,
    pub calories_raw: Option<String>,
    pub calories_numeric: Option<f64>,
    pub total_time: Option<String>,
    pub nutrient_values: Option<Json<NutrientMap>>,
    #[sqlx(skip)]
    pub tags: Vec<String>,
}

impl RecipeSummary {
    /// Parsed numeric value for a nutrient key, if present.
    pub fn nutrient_value(&self, key: &str) -> Option<f64> {
        self.nutrient_values
            .as_ref()
            .and_then(|nv| nv.get(key))
            .and_then(|n| n.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IngredientWithQuantity {
    pub name: String,
    pub quantity: Option<String>,
}

/// Recipe with all child relations hydrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetails {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<IngredientWithQuantity>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Name plus usage count, for tag/category listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NameCount {
    pub name: String,
    pub count: i64,
}

/// Flat record the indexing job consumes to synthesize embedding documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexableRecipe {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
}
