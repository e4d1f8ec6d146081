use crate::models::Model;
use crate::update::{PullProgress, UpdateAction, UpdateResult};
use chrono::Utc;
use futures_util::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Bar length; fractions are rendered in tenths of a percent
const BAR_SCALE: u64 = 1000;

/// Runs the update action for every outdated model
pub struct UpdateDispatcher {
    action: Arc<dyn UpdateAction>,
    parallel: bool,
    show_progress: bool,
}

impl UpdateDispatcher {
    #[must_use]
    pub fn new(action: Arc<dyn UpdateAction>, parallel: bool) -> Self {
        Self {
            action,
            parallel,
            show_progress: true,
        }
    }

    /// Draw progress bars (result lines are printed either way)
    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Update each model; one failure never stops the others
    ///
    /// Results come back in the order of `models`.
    pub async fn dispatch(&self, models: &[Model]) -> Vec<UpdateResult> {
        tracing::info!(
            "Updating {} models via {} ({})",
            models.len(),
            self.action.name(),
            if self.parallel { "parallel" } else { "sequential" }
        );

        if self.parallel {
            self.dispatch_parallel(models).await
        } else {
            self.dispatch_sequential(models).await
        }
    }

    async fn dispatch_sequential(&self, models: &[Model]) -> Vec<UpdateResult> {
        let mut results = Vec::with_capacity(models.len());

        for model in models {
            println!("Updating {}", model.name);
            let bar = if self.show_progress {
                ProgressBar::new(BAR_SCALE)
            } else {
                ProgressBar::hidden()
            };
            style_bar(&bar, &model.name);

            let result = update_one(self.action.as_ref(), &model.name, &bar).await;
            bar.finish_and_clear();
            print_result(&result);
            results.push(result);
        }

        results
    }

    async fn dispatch_parallel(&self, models: &[Model]) -> Vec<UpdateResult> {
        let multi = if self.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let updates = models.iter().map(|model| {
            let bar = multi.add(ProgressBar::new(BAR_SCALE));
            style_bar(&bar, &model.name);
            let action = self.action.as_ref();
            async move { update_one(action, &model.name, &bar).await }
        });

        let results = join_all(updates).await;
        for result in &results {
            multi.suspend(|| print_result(result));
        }
        results
    }
}

fn style_bar(bar: &ProgressBar, name: &str) {
    bar.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:30}] {percent:>3}% {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_prefix(name.to_string());
}

fn style_spinner(bar: &ProgressBar) {
    bar.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message("pulling");
    bar.enable_steady_tick(Duration::from_millis(120));
}

fn print_result(result: &UpdateResult) {
    match &result.error {
        None => println!("✓ Updated {}", result.model),
        Some(error) => println!("✗ Failed to update {}: {error}", result.model),
    }
}

/// Show one progress sample; returns its fraction
///
/// Samples are per layer, so a full bar only means that layer is done.
fn follow_sample(bar: &ProgressBar, sample: &PullProgress) -> f64 {
    let fraction = sample.fraction();
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    bar.set_position((fraction * BAR_SCALE as f64).round() as u64);
    if let Some(digest) = &sample.digest {
        bar.set_message(digest.clone());
    }
    fraction
}

/// Start, follow and await one update
async fn update_one(action: &dyn UpdateAction, name: &str, bar: &ProgressBar) -> UpdateResult {
    let started_at = Utc::now();
    let mut last_fraction = None;

    let outcome = match action.start(name).await {
        Ok(mut handle) => {
            if let Some(mut progress) = handle.progress() {
                while let Some(sample) = progress.recv().await {
                    last_fraction = Some(follow_sample(bar, &sample));
                }
            } else {
                style_spinner(bar);
            }
            handle.wait().await
        }
        Err(e) => Err(e),
    };

    let finished_at = Utc::now();
    match outcome {
        Ok(()) => {
            bar.finish_with_message("updated");
            tracing::info!("Updated {name}");
            UpdateResult {
                model: name.to_string(),
                error: None,
                progress: last_fraction,
                started_at,
                finished_at,
            }
        }
        Err(e) => {
            bar.abandon_with_message("failed");
            tracing::warn!("Update failed for {name}: {e}");
            UpdateResult {
                model: name.to_string(),
                error: Some(e.to_string()),
                progress: last_fraction,
                started_at,
                finished_at,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpdateError;
    use crate::update::UpdateHandle;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Streams two samples per model; `broken:*` models fail
    #[derive(Default)]
    struct ScriptedAction {
        started: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UpdateAction for ScriptedAction {
        async fn start(&self, model_name: &str) -> Result<UpdateHandle, UpdateError> {
            self.started.lock().unwrap().push(model_name.to_string());
            let fail = model_name.starts_with("broken:");
            let (tx, rx) = mpsc::channel(4);

            let task = tokio::spawn(async move {
                for completed in [50, 100] {
                    tx.send(PullProgress {
                        completed,
                        total: 100,
                        digest: Some("sha256:abc".into()),
                    })
                    .await
                    .ok();
                }
                if fail {
                    Err(UpdateError::Stream("manifest unknown".into()))
                } else {
                    Ok(())
                }
            });

            Ok(UpdateHandle::new(task).with_progress(rx))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn models() -> Vec<Model> {
        vec![
            Model::new("broken:latest", "a"),
            Model::new("llama3:latest", "b"),
        ]
    }

    #[tokio::test]
    async fn test_sequential_continues_after_failure() {
        let action = Arc::new(ScriptedAction::default());
        let dispatcher = UpdateDispatcher::new(action.clone(), false).with_progress(false);

        let results = dispatcher.dispatch(&models()).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].succeeded());
        assert!(results[0].error.as_deref().unwrap().contains("manifest unknown"));
        assert!(results[1].succeeded());
        assert_eq!(*action.started.lock().unwrap(), vec!["broken:latest", "llama3:latest"]);
    }

    #[tokio::test]
    async fn test_progress_reaches_one() {
        let action = Arc::new(ScriptedAction::default());
        let dispatcher = UpdateDispatcher::new(action, true).with_progress(false);

        let results = dispatcher.dispatch(&models()).await;

        for result in &results {
            assert_eq!(result.progress, Some(1.0));
            assert!(result.finished_at >= result.started_at);
        }
    }

    #[tokio::test]
    async fn test_start_failure_becomes_result() {
        struct Refusing;

        #[async_trait]
        impl UpdateAction for Refusing {
            async fn start(&self, _model_name: &str) -> Result<UpdateHandle, UpdateError> {
                Err(UpdateError::ToolNotFound("ollama".into()))
            }

            fn name(&self) -> &str {
                "refusing"
            }
        }

        let dispatcher = UpdateDispatcher::new(Arc::new(Refusing), true).with_progress(false);
        let results = dispatcher.dispatch(&models()).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.succeeded() && r.progress.is_none()));
    }

    #[test]
    fn test_finished_layer_does_not_mark_pull_complete() {
        let bar = ProgressBar::with_draw_target(Some(BAR_SCALE), ProgressDrawTarget::hidden());
        let layer = |digest: &str, completed| PullProgress {
            completed,
            total: 200,
            digest: Some(digest.to_string()),
        };

        let fraction = follow_sample(&bar, &layer("sha256:aaa", 200));
        assert!((fraction - 1.0).abs() < f64::EPSILON);
        assert_eq!(bar.position(), BAR_SCALE);
        assert_eq!(bar.message(), "sha256:aaa");

        follow_sample(&bar, &layer("sha256:bbb", 20));
        assert_eq!(bar.position(), 100);
        assert_eq!(bar.message(), "sha256:bbb");
    }
}
