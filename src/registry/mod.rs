pub mod http;

use crate::error::CheckError;
use async_trait::async_trait;

pub use http::HttpManifestFetcher;

/// Result of asking the remote registry for one manifest
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestResult {
    /// HTTP 200 with a JSON body
    Found(serde_json::Value),
    /// Any status other than 200; never retried
    NotFound(u16),
    /// Transport failure: timeout, DNS, reset
    Unreachable(String),
    /// 200 but the body is not JSON
    Malformed(String),
}

impl ManifestResult {
    /// The manifest, or the reason it could not be compared
    pub fn into_document(self) -> Result<serde_json::Value, CheckError> {
        match self {
            Self::Found(document) => Ok(document),
            Self::NotFound(status) => Err(CheckError::Status(status)),
            Self::Unreachable(reason) => Err(CheckError::Network(reason)),
            Self::Malformed(reason) => Err(CheckError::Malformed(reason)),
        }
    }
}

/// Remote manifest lookup for a local model name
///
/// Implementations must not fail: every error becomes a `ManifestResult`
/// so one bad model never aborts the batch.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch_manifest(&self, model_name: &str) -> ManifestResult;
}
