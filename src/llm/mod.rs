pub mod ollama;

use crate::error::Result;
use async_trait::async_trait;

pub use ollama::OllamaClient;

/// Text-to-vector collaborator. Callable concurrently; individual calls are
/// expected to fail occasionally and callers treat that as "no signal".
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Prompt-to-text collaborator used for answer generation.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}
