use crate::config::schema::RegistryConfig;
use crate::models::ModelReference;
use crate::registry::{ManifestFetcher, ManifestResult};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::time::Duration;

/// Registry manifest fetcher over HTTPS
#[derive(Debug, Clone)]
pub struct HttpManifestFetcher {
    client: reqwest::Client,
    base_url: String,
    namespace: String,
    accept: String,
    timeout: Duration,
}

impl HttpManifestFetcher {
    /// Create new fetcher from the `[registry]` config section
    #[must_use]
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            accept: config.accept.clone(),
            timeout: config.timeout(),
        }
    }

    /// Full manifest URL for a local model name
    #[must_use]
    pub fn manifest_url(&self, model_name: &str) -> String {
        let reference = ModelReference::parse(model_name, &self.namespace);
        format!("{}{}", self.base_url, reference.manifest_path())
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch_manifest(&self, model_name: &str) -> ManifestResult {
        let url = self.manifest_url(model_name);
        tracing::debug!("Fetching manifest for {model_name} from {url}");

        let response = match self
            .client
            .get(&url)
            .header(ACCEPT, &self.accept)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ManifestResult::Unreachable(e.to_string()),
        };

        match response.status() {
            StatusCode::OK => match response.json::<serde_json::Value>().await {
                Ok(document) => ManifestResult::Found(document),
                Err(e) if e.is_decode() => ManifestResult::Malformed(e.to_string()),
                Err(e) => ManifestResult::Unreachable(e.to_string()),
            },
            status => ManifestResult::NotFound(status.as_u16()),
        }
    }
}
