pub mod batch;
pub mod report;

use crate::models::{normalize_hash, Model};
use crate::registry::ManifestFetcher;
use std::fmt;
use std::sync::Arc;

pub use batch::BatchCoordinator;
pub use report::ProgressReporter;

/// Placeholder shown when the remote digest could not be computed
pub const UNKNOWN_DIGEST: &str = "unknown";

/// Classification of one model against the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    UpToDate,
    UpdateAvailable,
    CheckFailed,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UpToDate => "up to date",
            Self::UpdateAvailable => "update available",
            Self::CheckFailed => "check failed",
        })
    }
}

/// Result of checking one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub model: Model,
    pub status: CheckStatus,
    /// Present only when the manifest was fetched and hashed
    pub remote_digest: Option<String>,
    /// Failure reason for `CheckFailed`
    pub detail: Option<String>,
}

impl CheckOutcome {
    #[must_use]
    pub fn failed(model: Model, detail: impl Into<String>) -> Self {
        Self {
            model,
            status: CheckStatus::CheckFailed,
            remote_digest: None,
            detail: Some(detail.into()),
        }
    }

    /// Classify by digest comparison alone
    #[must_use]
    pub fn compared(model: Model, remote_digest: String) -> Self {
        let status = if remote_digest == model.digest {
            CheckStatus::UpToDate
        } else {
            CheckStatus::UpdateAvailable
        };

        Self {
            model,
            status,
            remote_digest: Some(remote_digest),
            detail: None,
        }
    }

    #[must_use]
    pub fn remote_digest_or_unknown(&self) -> &str {
        self.remote_digest.as_deref().unwrap_or(UNKNOWN_DIGEST)
    }

    #[must_use]
    pub fn is_outdated(&self) -> bool {
        self.status == CheckStatus::UpdateAvailable
    }

    /// Attributed one-line notice, `None` for up-to-date models
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        match self.status {
            CheckStatus::UpToDate => None,
            CheckStatus::UpdateAvailable => {
                Some(format!("You have an outdated version of {}", self.model.name))
            }
            CheckStatus::CheckFailed => Some(format!(
                "Could not check {}: {}",
                self.model.name,
                self.detail.as_deref().unwrap_or("unknown error")
            )),
        }
    }
}

/// Compares one local model against its remote manifest
#[derive(Clone)]
pub struct StalenessChecker {
    fetcher: Arc<dyn ManifestFetcher>,
}

impl StalenessChecker {
    #[must_use]
    pub fn new(fetcher: Arc<dyn ManifestFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch, hash and compare; every failure becomes `CheckFailed`
    pub async fn check(&self, model: &Model) -> CheckOutcome {
        let fetched = self.fetcher.fetch_manifest(&model.name).await;

        let computed = fetched
            .into_document()
            .and_then(|document| normalize_hash(&document));

        match computed {
            Ok(remote_digest) => {
                let outcome = CheckOutcome::compared(model.clone(), remote_digest);
                tracing::debug!("{}: {}", model.name, outcome.status);
                outcome
            }
            Err(e) => {
                tracing::warn!("Check failed for {}: {e}", model.name);
                CheckOutcome::failed(model.clone(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ManifestResult;
    use async_trait::async_trait;

    struct FixedFetcher(ManifestResult);

    #[async_trait]
    impl ManifestFetcher for FixedFetcher {
        async fn fetch_manifest(&self, _model_name: &str) -> ManifestResult {
            self.0.clone()
        }
    }

    fn checker(result: ManifestResult) -> StalenessChecker {
        StalenessChecker::new(Arc::new(FixedFetcher(result)))
    }

    #[tokio::test]
    async fn test_matching_digest_is_up_to_date() {
        let manifest = serde_json::json!({"schemaVersion": 2, "layers": []});
        let digest = normalize_hash(&manifest).unwrap();
        let model = Model::new("llama3:latest", digest.clone());

        let outcome = checker(ManifestResult::Found(manifest)).check(&model).await;
        assert_eq!(outcome.status, CheckStatus::UpToDate);
        assert_eq!(outcome.remote_digest.as_deref(), Some(digest.as_str()));
        assert!(outcome.notice().is_none());
    }

    #[tokio::test]
    async fn test_different_digest_is_update_available() {
        let manifest = serde_json::json!({"schemaVersion": 2});
        let model = Model::new("llama3:latest", "stale");

        let outcome = checker(ManifestResult::Found(manifest)).check(&model).await;
        assert_eq!(outcome.status, CheckStatus::UpdateAvailable);
        assert!(outcome.is_outdated());
        assert!(outcome.notice().unwrap().contains("llama3:latest"));
    }

    #[tokio::test]
    async fn test_not_found_is_check_failed() {
        let model = Model::new("foo:latest", "abc");

        let outcome = checker(ManifestResult::NotFound(404)).check(&model).await;
        assert_eq!(outcome.status, CheckStatus::CheckFailed);
        assert_eq!(outcome.remote_digest_or_unknown(), UNKNOWN_DIGEST);
        assert!(outcome.detail.as_deref().unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_unreachable_is_check_failed() {
        let model = Model::new("foo:latest", "abc");

        let outcome = checker(ManifestResult::Unreachable("connection reset".into()))
            .check(&model)
            .await;
        assert_eq!(outcome.status, CheckStatus::CheckFailed);
        let notice = outcome.notice().unwrap();
        assert!(notice.contains("foo:latest"));
        assert!(notice.contains("connection reset"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CheckStatus::UpToDate.to_string(), "up to date");
        assert_eq!(CheckStatus::UpdateAvailable.to_string(), "update available");
        assert_eq!(CheckStatus::CheckFailed.to_string(), "check failed");
    }
}
