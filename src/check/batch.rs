use crate::check::report::{ProgressReporter, Tally};
use crate::check::{CheckOutcome, StalenessChecker};
use crate::config::RunOptions;
use crate::models::Model;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

/// Aggregate of one checking pass
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One outcome per checked model, in input order
    pub outcomes: Vec<CheckOutcome>,
    /// Models left out by the skip set
    pub skipped: Vec<Model>,
    /// Notices in the order they were shown
    pub notices: Vec<String>,
}

impl BatchReport {
    /// Models whose remote digest differs from the local one
    #[must_use]
    pub fn outdated(&self) -> Vec<Model> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_outdated())
            .map(|outcome| outcome.model.clone())
            .collect()
    }

    #[must_use]
    pub fn tally(&self) -> Tally {
        Tally::from_outcomes(&self.outcomes, self.skipped.len())
    }
}

/// Runs the staleness checker over every local model at once
pub struct BatchCoordinator {
    checker: StalenessChecker,
    limit: Option<Arc<Semaphore>>,
    show_progress: bool,
}

impl BatchCoordinator {
    #[must_use]
    pub fn new(checker: StalenessChecker) -> Self {
        Self {
            checker,
            limit: None,
            show_progress: true,
        }
    }

    /// Cap outstanding registry requests; 0 leaves the fan-out unbounded
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        self
    }

    /// Draw the progress bar (notices are printed either way)
    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Check every model not excluded by `options.skip`
    ///
    /// Returns only after every dispatched check has reported back.
    pub async fn run(&self, models: Vec<Model>, options: &RunOptions) -> BatchReport {
        let (skipped, pending): (Vec<Model>, Vec<Model>) =
            models.into_iter().partition(|model| options.is_skipped(model));

        for model in &skipped {
            tracing::info!("Skipping {}", model.name);
        }

        if pending.is_empty() {
            return BatchReport {
                skipped,
                ..BatchReport::default()
            };
        }

        let total = pending.len();
        let mut reporter = if self.show_progress {
            ProgressReporter::new(total)
        } else {
            ProgressReporter::hidden(total)
        };

        // every task owns one sender; the receiver drains until all are gone
        let (tx, mut rx) = mpsc::channel::<(usize, CheckOutcome)>(total);
        for (index, model) in pending.iter().cloned().enumerate() {
            let tx = tx.clone();
            let checker = self.checker.clone();
            let limit = self.limit.clone();
            tokio::spawn(async move {
                let _permit = match limit {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let outcome = checker.check(&model).await;
                tx.send((index, outcome)).await.ok();
            });
        }
        drop(tx);

        let mut slots: Vec<Option<CheckOutcome>> = vec![None; total];
        while let Some((index, outcome)) = rx.recv().await {
            reporter.record(&outcome);
            slots[index] = Some(outcome);
        }

        // a task that panicked never sent; report it rather than drop it
        let outcomes = slots
            .into_iter()
            .zip(pending)
            .map(|(slot, model)| {
                slot.unwrap_or_else(|| {
                    let outcome = CheckOutcome::failed(model, "check task aborted");
                    reporter.record(&outcome);
                    outcome
                })
            })
            .collect();

        BatchReport {
            outcomes,
            skipped,
            notices: reporter.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckStatus;
    use crate::models::normalize_hash;
    use crate::registry::{ManifestFetcher, ManifestResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves `{"name": <model>}` for every model except `missing:*`
    #[derive(Default)]
    struct EchoFetcher {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    fn manifest_for(name: &str) -> serde_json::Value {
        serde_json::json!({ "name": name })
    }

    #[async_trait]
    impl ManifestFetcher for EchoFetcher {
        async fn fetch_manifest(&self, model_name: &str) -> ManifestResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if model_name.starts_with("missing:") {
                ManifestResult::NotFound(404)
            } else {
                ManifestResult::Found(manifest_for(model_name))
            }
        }
    }

    fn current(name: &str) -> Model {
        Model::new(name, normalize_hash(&manifest_for(name)).unwrap())
    }

    fn coordinator(fetcher: Arc<EchoFetcher>) -> BatchCoordinator {
        BatchCoordinator::new(StalenessChecker::new(fetcher)).with_progress(false)
    }

    #[tokio::test]
    async fn test_run_classifies_each_model() {
        let fetcher = Arc::new(EchoFetcher::default());
        let models = vec![
            current("llama3:latest"),
            Model::new("mistral:7b", "old"),
            Model::new("missing:latest", "abc"),
        ];

        let report = coordinator(fetcher.clone())
            .run(models, &RunOptions::default())
            .await;

        let statuses: Vec<CheckStatus> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                CheckStatus::UpToDate,
                CheckStatus::UpdateAvailable,
                CheckStatus::CheckFailed
            ]
        );
        assert_eq!(report.outdated(), vec![Model::new("mistral:7b", "old")]);
        assert_eq!(report.notices.len(), 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_skip_matches_name_or_digest() {
        let fetcher = Arc::new(EchoFetcher::default());
        let models = vec![
            Model::new("llama3:latest", "old"),
            Model::new("mistral:7b", "deadbeef"),
            Model::new("phi3:mini", "old"),
        ];
        let options = RunOptions {
            skip: RunOptions::parse_skip(["llama3:latest,deadbeef"]),
            ..RunOptions::default()
        };

        let report = coordinator(fetcher.clone()).run(models, &options).await;

        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outdated(), vec![Model::new("phi3:mini", "old")]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.tally().skipped, 2);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_requests() {
        let fetcher = Arc::new(EchoFetcher::default());
        let report = coordinator(fetcher.clone())
            .run(Vec::new(), &RunOptions::default())
            .await;

        assert!(report.outcomes.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unbounded_fan_out() {
        let fetcher = Arc::new(EchoFetcher::default());
        let models: Vec<Model> = (0..6).map(|i| Model::new(format!("m{i}:latest"), "x")).collect();

        coordinator(fetcher.clone())
            .run(models, &RunOptions::default())
            .await;

        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_concurrency_limit() {
        let fetcher = Arc::new(EchoFetcher::default());
        let models: Vec<Model> = (0..6).map(|i| Model::new(format!("m{i}:latest"), "x")).collect();

        let report = coordinator(fetcher.clone())
            .with_concurrency_limit(2)
            .run(models, &RunOptions::default())
            .await;

        assert_eq!(report.outcomes.len(), 6);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    }
}
