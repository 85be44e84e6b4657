use crate::config::OllamaConfig;
use crate::error::{Error, Result};
use crate::llm::{Completer, Embedder};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// HTTP client for a local Ollama instance, covering the two capabilities the
/// engine needs: embed(text) and complete(prompt).
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Embedding {} chars with {}", text.len(), self.config.embed_model);

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.config.base_url))
            .json(&json!({
                "model": self.config.embed_model,
                "prompt": text,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(Error::Embedding("Empty embedding returned".to_string()));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl Completer for OllamaClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        debug!("Completion request with {}", self.config.chat_model);

        let response = self
            .client
            .post(format!("{}/api/chat", self.config.base_url))
            .json(&json!({
                "model": self.config.chat_model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": prompt},
                ],
                "stream": false,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        Ok(body.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String) -> OllamaConfig {
        OllamaConfig {
            base_url,
            embed_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.1:8b".to_string(),
            request_timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_embed_parses_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [0.1, 0.2, 0.3]}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(test_config(server.url())).unwrap();
        let vector = client.embed("vegetable pulao").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_server_error_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(500)
            .create_async()
            .await;

        let client = OllamaClient::new(test_config(server.url())).unwrap();
        assert!(client.embed("anything").await.is_err());
    }

    #[tokio::test]
    async fn test_complete_parses_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": {"role": "assistant", "content": "Try the pulao."}}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(test_config(server.url())).unwrap();
        let answer = client.complete("You are helpful.", "What should I cook?").await.unwrap();
        assert_eq!(answer, "Try the pulao.");
    }
}
