use serde::{Deserialize, Serialize};

/// Query parameters for the structured filter search. List-valued filters
/// arrive comma-separated, e.g. `include_ingredients=onion,garlic`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub include_ingredients: Option<String>,
    #[serde(default)]
    pub exclude_ingredients: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cal_min: Option<f64>,
    #[serde(default)]
    pub cal_max: Option<f64>,
    #[serde(default)]
    pub nutrient: Option<String>,
    #[serde(default)]
    pub nutrient_max: Option<f64>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

/// Split a comma-separated filter value, dropping blanks.
pub fn split_csv(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Body of the natural-language search request.
#[derive(Debug, Clone, Deserialize)]
pub struct HybridSearchRequest {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReloadResponse {
    pub loaded: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_recipes: i64,
    pub total_ingredients: i64,
    pub total_tags: i64,
    pub total_categories: i64,
    pub indexed_vectors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv_drops_blanks() {
        let value = Some("onion, garlic,, ".to_string());
        assert_eq!(split_csv(&value), vec!["onion", "garlic"]);
        assert!(split_csv(&None).is_empty());
    }
}
