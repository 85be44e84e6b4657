//! Hybrid retrieval: the vector index, the indexing job that populates it,
//! and the fusion ranker that merges lexical and semantic candidates.

pub mod hybrid;
pub mod indexer;
pub mod vector_index;

pub use hybrid::{HybridSearchResults, FALLBACK_ANSWER, NO_MATCHES_ANSWER};
pub use indexer::{build_document, IndexingState, IndexingStatus};
pub use vector_index::{RecipeMeta, ScoredPoint, VectorIndex};

use crate::config::SearchConfig;
use crate::llm::{Completer, Embedder};
use std::sync::Arc;

/// Owns the vector index, the indexing state machine, and the model
/// collaborators. One instance per process; shared behind an `Arc`.
pub struct RagEngine {
    pub(crate) index: Arc<VectorIndex>,
    pub(crate) status: Arc<IndexingState>,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) completer: Arc<dyn Completer>,
    pub(crate) tuning: SearchConfig,
}

impl RagEngine {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
        tuning: SearchConfig,
    ) -> Self {
        Self {
            index,
            status: Arc::new(IndexingState::default()),
            embedder,
            completer,
            tuning,
        }
    }

    /// The underlying vector index.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Point-in-time snapshot of the indexing status.
    pub fn indexing_status(&self) -> IndexingStatus {
        self.status.snapshot()
    }

    /// Number of embeddings currently held by the vector index.
    pub fn vector_count(&self) -> usize {
        self.index.count()
    }
}
