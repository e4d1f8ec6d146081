use crate::error::{Result, SyncError};
use crate::models::Model;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Source of the installed model list
#[async_trait]
pub trait LocalRegistry: Send + Sync {
    /// Every installed model with the digest it was installed under
    async fn list_models(&self) -> Result<Vec<Model>>;
}

/// Local ollama server, queried through `GET /api/tags`
#[derive(Debug, Clone)]
pub struct OllamaLocalRegistry {
    client: reqwest::Client,
    host: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<Model>,
}

impl OllamaLocalRegistry {
    #[must_use]
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.host)
    }
}

#[async_trait]
impl LocalRegistry for OllamaLocalRegistry {
    async fn list_models(&self) -> Result<Vec<Model>> {
        let url = self.tags_url();
        tracing::debug!("Listing installed models from {url}");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SyncError::LocalRegistry(format!("Could not reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::LocalRegistry(format!(
                "{url} returned HTTP {status}"
            )));
        }

        let tags: TagsResponse = response.json().await.map_err(|e| {
            SyncError::LocalRegistry(format!("Invalid model list from {url}: {e}"))
        })?;

        tracing::info!("Found {} installed models", tags.models.len());
        Ok(tags.models)
    }
}
