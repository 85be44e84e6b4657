//! Embedding-keyed similarity index over recipe documents.
//!
//! The index lives in memory as a map from recipe id to a normalized vector
//! and is persisted as a single JSON file, written atomically (temp file +
//! rename). Cosine scoring over the full index runs on the blocking pool so
//! it cannot starve concurrent request handling.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Metadata carried alongside each vector so the fusion ranker can
/// keyword-boost candidates without a store round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeMeta {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Stored L2-normalized; zero vectors stay zero and never match.
    pub vector: Vec<f32>,
    /// The document string the vector was produced from.
    pub document: String,
    pub metadata: RecipeMeta,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub recipe_id: i64,
    /// Cosine distance; smaller is more similar.
    pub distance: f32,
    pub metadata: RecipeMeta,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedIndex {
    records: HashMap<i64, EmbeddingRecord>,
}

pub struct VectorIndex {
    path: PathBuf,
    records: Arc<RwLock<HashMap<i64, EmbeddingRecord>>>,
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

impl VectorIndex {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or overwrite the entry for a recipe id. Readers never observe a
    /// partially written vector; the record is swapped in under the write lock.
    pub fn upsert(&self, recipe_id: i64, vector: Vec<f32>, metadata: RecipeMeta, document: String) {
        let record = EmbeddingRecord {
            vector: normalize(vector),
            document,
            metadata,
        };

        let mut records = self.records.write().expect("vector index lock poisoned");
        records.insert(recipe_id, record);
    }

    pub fn clear(&self) {
        let mut records = self.records.write().expect("vector index lock poisoned");
        records.clear();
    }

    pub fn count(&self) -> usize {
        self.records.read().expect("vector index lock poisoned").len()
    }

    /// Top-k cosine query, ascending by distance. An empty index or a
    /// zero-magnitude query yields an empty result, not an error.
    pub async fn query(&self, vector: Vec<f32>, k: usize) -> Vec<ScoredPoint> {
        let records = Arc::clone(&self.records);

        let scored = tokio::task::spawn_blocking(move || {
            let query = normalize(vector);
            if query.iter().all(|x| *x == 0.0) {
                return Vec::new();
            }

            let records = records.read().expect("vector index lock poisoned");
            let mut scored: Vec<ScoredPoint> = records
                .iter()
                .filter(|(_, record)| record.vector.len() == query.len())
                .map(|(id, record)| {
                    let dot: f32 = record
                        .vector
                        .iter()
                        .zip(query.iter())
                        .map(|(a, b)| a * b)
                        .sum();
                    ScoredPoint {
                        recipe_id: *id,
                        distance: 1.0 - dot,
                        metadata: record.metadata.clone(),
                    }
                })
                .collect();

            scored.sort_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            scored.truncate(k);
            scored
        })
        .await;

        match scored {
            Ok(scored) => scored,
            Err(e) => {
                warn!("Vector scoring task failed: {e}");
                Vec::new()
            }
        }
    }

    /// Persist the index atomically: write a temp file, then rename over the
    /// target so readers of the file never see a partial write.
    pub async fn save(&self) -> Result<()> {
        let snapshot = {
            let records = self.records.read().expect("vector index lock poisoned");
            PersistedIndex {
                records: records.clone(),
            }
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_string(&snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!("Saved {} embeddings to {:?}", snapshot.records.len(), self.path);
        Ok(())
    }

    /// Re-attach to the persisted state, replacing whatever is in memory.
    /// A missing file means an empty index; a corrupt file is logged and
    /// treated the same way.
    pub async fn load(&self) -> Result<usize> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No embeddings file at {:?}; vector index starts empty", self.path);
                self.clear();
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let persisted: PersistedIndex = match serde_json::from_str(&data) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Failed to parse embeddings file {:?}: {e}", self.path);
                self.clear();
                return Ok(0);
            }
        };

        let count = persisted.records.len();
        {
            let mut records = self.records.write().expect("vector index lock poisoned");
            *records = persisted.records;
        }

        info!("Loaded {} recipe embeddings from {:?}", count, self.path);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> RecipeMeta {
        RecipeMeta {
            name: name.to_string(),
            url: format!("https://example.com/{}", name.to_lowercase().replace(' ', "-")),
        }
    }

    fn index_in(dir: &tempfile::TempDir) -> VectorIndex {
        VectorIndex::new(dir.path().join("embeddings.json"))
    }

    #[tokio::test]
    async fn test_empty_index_query_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_in(&dir);
        let hits = index.query(vec![1.0, 0.0], 10).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_query_orders_by_cosine_distance() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_in(&dir);

        index.upsert(1, vec![1.0, 0.0], meta("Exact"), "doc".to_string());
        index.upsert(2, vec![1.0, 1.0], meta("Close"), "doc".to_string());
        index.upsert(3, vec![0.0, 1.0], meta("Orthogonal"), "doc".to_string());

        let hits = index.query(vec![1.0, 0.0], 10).await;
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].recipe_id, 1);
        assert!(hits[0].distance.abs() < 1e-5);
        assert_eq!(hits[1].recipe_id, 2);
        assert_eq!(hits[2].recipe_id, 3);
        assert!(hits[1].distance < hits[2].distance);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_in(&dir);

        index.upsert(1, vec![1.0, 0.0], meta("First"), "doc-a".to_string());
        index.upsert(1, vec![0.0, 1.0], meta("Second"), "doc-b".to_string());
        assert_eq!(index.count(), 1);

        let hits = index.query(vec![0.0, 1.0], 1).await;
        assert_eq!(hits[0].metadata.name, "Second");
        assert!(hits[0].distance.abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");

        let index = VectorIndex::new(&path);
        index.upsert(7, vec![0.6, 0.8], meta("Pulao"), "Pulao. Ingredients: rice".to_string());
        index.save().await.unwrap();

        let reopened = VectorIndex::new(&path);
        assert_eq!(reopened.load().await.unwrap(), 1);
        let hits = reopened.query(vec![0.6, 0.8], 1).await;
        assert_eq!(hits[0].recipe_id, 7);
        assert_eq!(hits[0].metadata.name, "Pulao");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_in(&dir);
        assert_eq!(index.load().await.unwrap(), 0);
        assert_eq!(index.count(), 0);
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let index = VectorIndex::new(&path);
        assert_eq!(index.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_query_vector_matches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_in(&dir);
        index.upsert(1, vec![1.0, 0.0], meta("Anything"), "doc".to_string());

        let hits = index.query(vec![0.0, 0.0], 10).await;
        assert!(hits.is_empty());
    }
}
