use crate::rag::HybridSearchResults;
use crate::{Error, Result};
use reqwest::Client;
use serde_json::json;

/// Search recipes against a running server and print the results.
pub async fn search(server_url: &str, query: &str, limit: i64) -> Result<()> {
    let client = Client::new();

    let response = client
        .post(format!("{server_url}/api/search"))
        .json(&json!({
            "query": query,
            "page": 1,
            "page_size": limit,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::Internal(format!(
            "Search failed: server returned {}",
            response.status()
        )));
    }

    let results: HybridSearchResults = response.json().await?;
    print_search_results(query, &results);

    Ok(())
}

fn print_search_results(query: &str, results: &HybridSearchResults) {
    println!("\nSearch: \"{query}\"");
    println!("{}", "=".repeat(60));
    println!("{}\n", results.answer);

    if results.recipes.is_empty() {
        println!("No recipes found.");
        return;
    }

    println!("Found {} recipes:\n", results.total);
    for (i, details) in results.recipes.iter().enumerate() {
        println!("{}. {}", i + 1, details.recipe.name);
        if !details.tags.is_empty() {
            println!("   Tags: {}", details.tags.join(", "));
        }
        println!("   {}", details.recipe.url);
    }
}
