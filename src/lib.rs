pub mod config;
pub mod db;
pub mod error;

// Ingestion (JSON import from the scraper's export)
pub mod ingest;

// External model collaborators (embeddings + completion)
pub mod llm;

// Hybrid retrieval: vector index, indexing job, fusion ranker
pub mod rag;

// HTTP API
pub mod api;

// CLI
pub mod cli;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
