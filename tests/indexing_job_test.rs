use async_trait::async_trait;
use rasoi::config::SearchConfig;
use rasoi::db::models::{NewRecipe, NutrientMap};
use rasoi::db::{self, ingredients, recipes};
use rasoi::llm::{Completer, Embedder};
use rasoi::rag::{RagEngine, VectorIndex};
use rasoi::{Error, Result};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Embedder that fails for documents containing a marker string and counts
/// every request it receives.
struct SelectiveEmbedder {
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl SelectiveEmbedder {
    fn new(fail_on: Option<&str>) -> Arc<Self> {
        Arc::new(SelectiveEmbedder {
            fail_on: fail_on.map(str::to_string),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for SelectiveEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_on {
            if text.contains(marker) {
                return Err(Error::Embedding("model unavailable".to_string()));
            }
        }
        Ok(vec![1.0, 0.0])
    }
}

struct NoopCompleter;

#[async_trait]
impl Completer for NoopCompleter {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        Ok(String::new())
    }
}

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    db::run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

async fn seed_recipe(pool: &SqlitePool, name: &str) -> i64 {
    let slug = name.to_lowercase().replace(' ', "-");
    let recipe = recipes::create_recipe(
        pool,
        &NewRecipe {
            name: name.to_string(),
            url: format!("https://example.com/{slug}"),
            makes: None,
            calories_raw: None,
            calories_numeric: None,
            soaking_time: None,
            preparation_time: None,
            cooking_time: None,
            baking_time: None,
            baking_temperature: None,
            sprouting_time: None,
            total_time: None,
            nutrient_values: NutrientMap::new(),
        },
    )
    .await
    .expect("Failed to create recipe")
    .expect("Duplicate url in test seed");

    ingredients::add_recipe_ingredient(pool, recipe.id, "rice", Some("1 cup"))
        .await
        .expect("Failed to add ingredient");

    recipe.id
}

fn engine_with(dir: &tempfile::TempDir, embedder: Arc<SelectiveEmbedder>) -> RagEngine {
    let index = Arc::new(VectorIndex::new(dir.path().join("embeddings.json")));
    RagEngine::new(index, embedder, Arc::new(NoopCompleter), SearchConfig::default())
}

#[tokio::test]
async fn test_indexing_embeds_every_recipe() {
    let pool = setup_pool().await;
    seed_recipe(&pool, "Vegetable Pulao").await;
    seed_recipe(&pool, "Palak Paneer").await;
    seed_recipe(&pool, "Garlic Naan").await;

    let dir = tempfile::tempdir().unwrap();
    let embedder = SelectiveEmbedder::new(None);
    let engine = engine_with(&dir, embedder.clone());

    let recipes = recipes::list_indexable_recipes(&pool).await.unwrap();
    let indexed = engine.index_recipes(recipes).await.unwrap();

    assert_eq!(indexed, 3);
    assert_eq!(engine.vector_count(), 3);
    assert_eq!(embedder.call_count(), 3);

    let status = engine.indexing_status();
    assert!(!status.is_indexing);
    assert_eq!(status.processed, 3);
    assert_eq!(status.total, 3);
    assert_eq!(status.message, "Completed");
}

#[tokio::test]
async fn test_index_is_persisted_and_reloadable() {
    let pool = setup_pool().await;
    seed_recipe(&pool, "Vegetable Pulao").await;

    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, SelectiveEmbedder::new(None));

    let recipes = recipes::list_indexable_recipes(&pool).await.unwrap();
    engine.index_recipes(recipes).await.unwrap();

    // A fresh engine over the same path sees the persisted index
    let fresh = engine_with(&dir, SelectiveEmbedder::new(None));
    assert_eq!(fresh.reload().await.unwrap(), 1);
    assert_eq!(fresh.vector_count(), 1);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected_without_touching_status() {
    let pool = setup_pool().await;
    seed_recipe(&pool, "Vegetable Pulao").await;

    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, SelectiveEmbedder::new(None));

    let _claim = engine.claim_indexing().expect("first claim should succeed");
    let before = engine.indexing_status();
    assert!(before.is_indexing);

    let recipes = recipes::list_indexable_recipes(&pool).await.unwrap();
    let result = engine.index_recipes(recipes).await;
    assert!(matches!(result, Err(Error::ReindexInProgress)));

    // The rejected call must not have written anything
    let after = engine.indexing_status();
    assert!(after.is_indexing);
    assert_eq!(after.processed, before.processed);
    assert_eq!(after.message, before.message);
}

#[tokio::test]
async fn test_claim_is_released_after_run() {
    let pool = setup_pool().await;
    seed_recipe(&pool, "Vegetable Pulao").await;

    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, SelectiveEmbedder::new(None));

    let recipes = recipes::list_indexable_recipes(&pool).await.unwrap();
    engine.index_recipes(recipes.clone()).await.unwrap();

    // The slot is free again once the run finishes
    engine.index_recipes(recipes).await.unwrap();
}

#[tokio::test]
async fn test_failed_embedding_skips_recipe_not_run() {
    let pool = setup_pool().await;
    seed_recipe(&pool, "Vegetable Pulao").await;
    seed_recipe(&pool, "Palak Paneer").await;
    seed_recipe(&pool, "Garlic Naan").await;

    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, SelectiveEmbedder::new(Some("Palak")));

    let recipes = recipes::list_indexable_recipes(&pool).await.unwrap();
    let indexed = engine.index_recipes(recipes).await.unwrap();

    assert_eq!(indexed, 2, "failed recipe is skipped, run still completes");
    assert_eq!(engine.vector_count(), 2);
    assert_eq!(engine.indexing_status().message, "Completed");
}

#[tokio::test]
async fn test_rebuild_replaces_stale_entries() {
    let pool = setup_pool().await;
    seed_recipe(&pool, "Vegetable Pulao").await;

    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, SelectiveEmbedder::new(None));

    // Simulate a leftover entry for a recipe that was deleted
    engine.index().upsert(
        9999,
        vec![1.0, 0.0],
        rasoi::rag::RecipeMeta {
            name: "Ghost".to_string(),
            url: "https://example.com/ghost".to_string(),
        },
        "doc".to_string(),
    );
    assert_eq!(engine.vector_count(), 1);

    let recipes = recipes::list_indexable_recipes(&pool).await.unwrap();
    engine.index_recipes(recipes.clone()).await.unwrap();
    assert_eq!(engine.vector_count(), 1, "rebuild starts from a cleared index");

    // A second rebuild is idempotent
    engine.index_recipes(recipes).await.unwrap();
    assert_eq!(engine.vector_count(), 1);
}

#[tokio::test]
async fn test_save_failure_reports_failed_status_and_releases_claim() {
    let pool = setup_pool().await;
    seed_recipe(&pool, "Vegetable Pulao").await;

    // Persistence path whose parent is a plain file, so saving cannot work
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let index = Arc::new(VectorIndex::new(blocker.join("embeddings.json")));
    let engine = RagEngine::new(
        index,
        SelectiveEmbedder::new(None),
        Arc::new(NoopCompleter),
        SearchConfig::default(),
    );

    let recipes = recipes::list_indexable_recipes(&pool).await.unwrap();
    assert!(engine.index_recipes(recipes.clone()).await.is_err());

    let status = engine.indexing_status();
    assert!(!status.is_indexing, "claim must be released on the error path");
    assert!(status.message.starts_with("Failed:"), "got: {}", status.message);

    // The slot is free again; only the save still fails
    assert!(engine.index_recipes(recipes).await.is_err());
}

#[tokio::test]
async fn test_reload_rejected_while_indexing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, SelectiveEmbedder::new(None));

    let _claim = engine.claim_indexing().unwrap();
    assert!(matches!(engine.reload().await, Err(Error::ReindexInProgress)));
}

#[tokio::test]
async fn test_indexing_empty_store_completes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, SelectiveEmbedder::new(None));

    let indexed = engine.index_recipes(Vec::new()).await.unwrap();
    assert_eq!(indexed, 0);
    assert_eq!(engine.indexing_status().message, "Completed");
}
