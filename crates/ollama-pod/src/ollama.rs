//! Remote Ollama control.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default Ollama container image.
pub const OLLAMA_IMAGE: &str = "ollama/ollama";

/// Port Ollama listens on inside the container.
pub const OLLAMA_PORT: u16 = 11434;

/// Pulls can take minutes for large models.
const PULL_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

/// Client for an Ollama server running on a pod.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
}

impl OllamaClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(PULL_TIMEOUT_SECS))
    }

    /// Create a new client with a custom request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Ask the Ollama server at `endpoint` to download `model`, waiting for
    /// the download to finish.
    ///
    /// # Errors
    /// [`Error::Transfer`] on a transport failure or non-success response.
    pub async fn pull_model(&self, endpoint: &str, model: &str) -> Result<()> {
        let url = format!("{}/api/pull", endpoint.trim_end_matches('/'));
        info!(url = %url, model = %model, "Pulling model");

        let response = self
            .client
            .post(&url)
            .json(&PullRequest {
                name: model,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| Error::Transfer(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transfer(format!("{url} returned {status}: {body}")));
        }

        debug!(model = %model, "Model pull finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_pull_model_posts_name_without_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .and(body_json(json!({ "name": "qwen2.5:7b", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new().unwrap();
        client.pull_model(&server.uri(), "qwen2.5:7b").await.unwrap();
    }

    #[tokio::test]
    async fn test_pull_model_error_status_is_transfer_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(500).set_body_string("pull model manifest: file does not exist"))
            .mount(&server)
            .await;

        let client = OllamaClient::new().unwrap();
        let err = client
            .pull_model(&server.uri(), "nope:latest")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transfer(ref msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_pull_model_unreachable_is_transfer_error() {
        let client = OllamaClient::with_timeout(Duration::from_secs(2)).unwrap();
        let err = client
            .pull_model("http://127.0.0.1:1", "qwen2.5:7b")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transfer(_)));
    }
}
