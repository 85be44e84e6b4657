//! The indexing job: batches every recipe, requests embeddings with bounded
//! concurrency, and rebuilds the vector index. Exactly one run may be active
//! at a time; progress is observable only through [`IndexingStatus`]
//! snapshots.

use crate::db::models::IndexableRecipe;
use crate::db::{recipes, DbPool};
use crate::error::{Error, Result};
use crate::rag::vector_index::RecipeMeta;
use crate::rag::RagEngine;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingStatus {
    pub is_indexing: bool,
    pub processed: usize,
    pub total: usize,
    pub message: String,
}

impl Default for IndexingStatus {
    fn default() -> Self {
        IndexingStatus {
            is_indexing: false,
            processed: 0,
            total: 0,
            message: "Idle".to_string(),
        }
    }
}

/// Process-wide indexing state: a single-flight flag plus the status the
/// running job writes and pollers snapshot. Readers get eventually-consistent
/// snapshots; only the active run writes.
#[derive(Debug, Default)]
pub struct IndexingState {
    running: AtomicBool,
    status: RwLock<IndexingStatus>,
}

impl IndexingState {
    pub fn snapshot(&self) -> IndexingStatus {
        self.status.read().expect("status lock poisoned").clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn update(&self, f: impl FnOnce(&mut IndexingStatus)) {
        let mut status = self.status.write().expect("status lock poisoned");
        f(&mut status);
    }
}

/// Exclusive right to run one indexing pass. Dropping the claim clears the
/// running flag and `is_indexing` on every exit path, including panics and
/// early errors.
pub struct IndexingClaim {
    state: Arc<IndexingState>,
}

impl Drop for IndexingClaim {
    fn drop(&mut self) {
        self.state.update(|s| s.is_indexing = false);
        self.state.running.store(false, Ordering::Release);
    }
}

/// Build the document string an embedding is requested for:
/// name, ingredient names, then tags when present.
pub fn build_document(recipe: &IndexableRecipe) -> String {
    let mut document = format!("{}. Ingredients: {}", recipe.name, recipe.ingredients.join(", "));
    if !recipe.tags.is_empty() {
        document.push_str(&format!(". Tags: {}", recipe.tags.join(", ")));
    }
    document
}

impl RagEngine {
    /// Claim the single-flight slot. A concurrent caller gets
    /// [`Error::ReindexInProgress`] immediately and the status is untouched.
    pub fn claim_indexing(&self) -> Result<IndexingClaim> {
        if self
            .status
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::ReindexInProgress);
        }

        self.status.update(|s| {
            s.is_indexing = true;
            s.processed = 0;
            s.total = 0;
            s.message = "Starting indexing...".to_string();
        });

        Ok(IndexingClaim {
            state: Arc::clone(&self.status),
        })
    }

    /// Rebuild the vector index from the given recipes. Convenience wrapper
    /// around [`claim_indexing`](Self::claim_indexing) + [`run_indexing`](Self::run_indexing).
    pub async fn index_recipes(&self, recipes: Vec<IndexableRecipe>) -> Result<usize> {
        let claim = self.claim_indexing()?;
        self.run_indexing(claim, recipes).await
    }

    /// The indexing pass itself. A refresh is a full rebuild: the index is
    /// cleared first so stale entries for deleted recipes cannot persist.
    /// Batches run strictly in sequence; embedding requests within a batch
    /// run concurrently under the configured limit. A single failed embedding
    /// skips that recipe, never the run.
    pub async fn run_indexing(
        &self,
        claim: IndexingClaim,
        recipes: Vec<IndexableRecipe>,
    ) -> Result<usize> {
        let _claim = claim;
        let total = recipes.len();

        info!("Indexing {} recipes (batch size {}, concurrency {})",
            total, self.tuning.index_batch_size, self.tuning.embed_concurrency);

        self.status.update(|s| s.total = total);
        self.index.clear();

        let semaphore = Arc::new(Semaphore::new(self.tuning.embed_concurrency));
        let mut indexed = 0usize;
        let mut processed = 0usize;

        for batch in recipes.chunks(self.tuning.index_batch_size) {
            let embeds = batch.iter().map(|recipe| {
                let semaphore = Arc::clone(&semaphore);
                let embedder = Arc::clone(&self.embedder);
                async move {
                    // The semaphore is never closed while the run is alive.
                    let _permit = semaphore.acquire().await.ok()?;
                    let document = build_document(recipe);
                    match embedder.embed(&document).await {
                        Ok(vector) => Some((recipe, vector, document)),
                        Err(e) => {
                            warn!("Failed to embed recipe {}: {e}", recipe.id);
                            None
                        }
                    }
                }
            });

            let results = futures::future::join_all(embeds).await;

            for (recipe, vector, document) in results.into_iter().flatten() {
                self.index.upsert(
                    recipe.id,
                    vector,
                    RecipeMeta {
                        name: recipe.name.clone(),
                        url: recipe.url.clone(),
                    },
                    document,
                );
                indexed += 1;
            }

            processed += batch.len();
            self.status.update(|s| {
                s.processed = processed;
                s.message = format!("Processed {processed}/{total}");
            });
            debug!("Processed {processed}/{total}");
        }

        self.status.update(|s| s.message = "Saving to disk...".to_string());
        if let Err(e) = self.index.save().await {
            self.status.update(|s| s.message = format!("Failed: {e}"));
            return Err(e);
        }

        self.status.update(|s| s.message = "Completed".to_string());
        info!("Indexing complete: {indexed} of {total} recipes embedded");

        Ok(indexed)
    }

    /// Fetch every recipe from the store and rebuild the index with an
    /// already-held claim. This is what the reindex endpoint spawns after
    /// claiming the slot synchronously.
    pub async fn run_indexing_from_store(
        &self,
        claim: IndexingClaim,
        pool: &DbPool,
    ) -> Result<usize> {
        let recipes = match recipes::list_indexable_recipes(pool).await {
            Ok(recipes) => recipes,
            Err(e) => {
                self.status.update(|s| s.message = format!("Failed: {e}"));
                return Err(e);
            }
        };
        self.run_indexing(claim, recipes).await
    }

    /// Re-attach to the persisted index without rebuilding. Rejected while a
    /// rebuild is running.
    pub async fn reload(&self) -> Result<usize> {
        if self.status.is_running() {
            return Err(Error::ReindexInProgress);
        }
        self.index.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_document_format() {
        let recipe = IndexableRecipe {
            id: 1,
            name: "Vegetable Pulao".to_string(),
            url: "https://example.com/pulao".to_string(),
            ingredients: vec!["rice".to_string(), "peas".to_string()],
            tags: vec!["pulao".to_string(), "rice".to_string()],
        };
        assert_eq!(
            build_document(&recipe),
            "Vegetable Pulao. Ingredients: rice, peas. Tags: pulao, rice"
        );
    }

    #[test]
    fn test_build_document_without_tags() {
        let recipe = IndexableRecipe {
            id: 1,
            name: "Plain Rice".to_string(),
            url: "https://example.com/rice".to_string(),
            ingredients: vec!["rice".to_string()],
            tags: vec![],
        };
        assert_eq!(build_document(&recipe), "Plain Rice. Ingredients: rice");
    }

    #[test]
    fn test_status_default_is_idle() {
        let status = IndexingStatus::default();
        assert!(!status.is_indexing);
        assert_eq!(status.message, "Idle");
    }
}
