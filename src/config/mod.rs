use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub ollama: OllamaConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub request_timeout_seconds: u64,
}

/// Tuning knobs for the indexing job and the fusion ranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Where the vector index is persisted.
    pub embeddings_path: PathBuf,
    /// Recipes per indexing batch; status is updated after every batch.
    pub index_batch_size: usize,
    /// Max in-flight embedding requests during indexing.
    pub embed_concurrency: usize,
    /// Candidates requested from the lexical probe.
    pub lexical_candidates: usize,
    /// Candidates requested from the vector index.
    pub semantic_top_k: usize,
    /// Cosine-distance acceptance threshold for semantic candidates.
    pub distance_threshold: f32,
    /// Recipes handed to the answer generator.
    pub context_size: usize,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./data/rasoi.db".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PORT value".to_string()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DATABASE_MAX_CONNECTIONS value".to_string()))?;

        let min_connections = std::env::var("DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DATABASE_MIN_CONNECTIONS value".to_string()))?;

        let connection_timeout_seconds = std::env::var("DATABASE_CONNECTION_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DATABASE_CONNECTION_TIMEOUT value".to_string()))?;

        let ollama_base_url =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| "http://localhost:11434".to_string());

        let embed_model =
            std::env::var("OLLAMA_EMBED_MODEL").unwrap_or_else(|_| "nomic-embed-text".to_string());

        let chat_model =
            std::env::var("OLLAMA_CHAT_MODEL").unwrap_or_else(|_| "llama3.1:8b".to_string());

        let request_timeout_seconds = std::env::var("OLLAMA_TIMEOUT")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid OLLAMA_TIMEOUT value".to_string()))?;

        let embeddings_path = std::env::var("EMBEDDINGS_PATH")
            .unwrap_or_else(|_| "./data/recipe_embeddings.json".to_string())
            .into();

        let index_batch_size = std::env::var("INDEX_BATCH_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid INDEX_BATCH_SIZE value".to_string()))?;

        let embed_concurrency = std::env::var("EMBED_CONCURRENCY")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid EMBED_CONCURRENCY value".to_string()))?;

        let distance_threshold = std::env::var("DISTANCE_THRESHOLD")
            .unwrap_or_else(|_| "0.55".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DISTANCE_THRESHOLD value".to_string()))?;

        Ok(Settings {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                min_connections,
                connection_timeout_seconds,
            },
            server: ServerConfig { host, port },
            ollama: OllamaConfig {
                base_url: ollama_base_url,
                embed_model,
                chat_model,
                request_timeout_seconds,
            },
            search: SearchConfig {
                embeddings_path,
                index_batch_size,
                embed_concurrency,
                lexical_candidates: 100,
                semantic_top_k: 100,
                distance_threshold,
                context_size: 5,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.search.index_batch_size == 0 {
            return Err(Error::Config("Index batch size must be non-zero".to_string()));
        }

        if self.search.embed_concurrency == 0 {
            return Err(Error::Config(
                "Embedding concurrency must be non-zero".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.search.distance_threshold) {
            return Err(Error::Config(
                "Distance threshold must be within [0, 2]".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            embeddings_path: "./data/recipe_embeddings.json".into(),
            index_batch_size: 50,
            embed_concurrency: 5,
            lexical_candidates: 100,
            semantic_top_k: 100,
            distance_threshold: 0.55,
            context_size: 5,
        }
    }
}
