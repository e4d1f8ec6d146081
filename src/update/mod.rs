pub mod command;
pub mod dispatch;
pub mod stream;

use crate::error::UpdateError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use command::CommandUpdateAction;
pub use dispatch::UpdateDispatcher;
pub use stream::StreamingUpdateAction;

/// One progress sample from a streaming pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullProgress {
    pub completed: u64,
    pub total: u64,
    /// Layer currently being transferred
    pub digest: Option<String>,
}

impl PullProgress {
    /// Completed share in `[0, 1]`; an unknown total counts as no progress
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// A running update for one model
///
/// Progress is optional: actions that cannot report it leave the stream
/// empty and callers fall back to waiting.
pub struct UpdateHandle {
    progress: Option<mpsc::Receiver<PullProgress>>,
    task: JoinHandle<Result<(), UpdateError>>,
}

impl UpdateHandle {
    #[must_use]
    pub fn new(task: JoinHandle<Result<(), UpdateError>>) -> Self {
        Self {
            progress: None,
            task,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: mpsc::Receiver<PullProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Take the progress stream, if the action provides one
    pub fn progress(&mut self) -> Option<mpsc::Receiver<PullProgress>> {
        self.progress.take()
    }

    /// Wait for the update to finish
    pub async fn wait(self) -> Result<(), UpdateError> {
        let Self { progress, task } = self;
        drop(progress);
        task.await.unwrap_or(Err(UpdateError::Aborted))
    }
}

/// Capability to re-download one model
#[async_trait]
pub trait UpdateAction: Send + Sync {
    /// Start updating `model_name`; the update runs in the background
    async fn start(&self, model_name: &str) -> Result<UpdateHandle, UpdateError>;

    /// Short label for logs
    fn name(&self) -> &str;
}

/// Outcome of one update attempt
///
/// Success means the action completed; the new local digest is not
/// re-checked against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub model: String,
    pub error: Option<String>,
    /// Last reported fraction, when the action streamed progress
    pub progress: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl UpdateResult {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let sample = |completed, total| PullProgress {
            completed,
            total,
            digest: None,
        };
        assert!((sample(50, 200).fraction() - 0.25).abs() < f64::EPSILON);
        assert!((sample(200, 200).fraction() - 1.0).abs() < f64::EPSILON);
        assert!((sample(300, 200).fraction() - 1.0).abs() < f64::EPSILON);
        assert!(sample(10, 0).fraction().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_handle_wait_reports_task_result() {
        let handle = UpdateHandle::new(tokio::spawn(async { Ok(()) }));
        assert_eq!(handle.wait().await, Ok(()));

        let handle = UpdateHandle::new(tokio::spawn(async {
            Err(UpdateError::Stream("boom".into()))
        }));
        assert_eq!(handle.wait().await, Err(UpdateError::Stream("boom".into())));
    }

    #[tokio::test]
    async fn test_handle_wait_aborted_task() {
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(())
        });
        task.abort();
        assert_eq!(UpdateHandle::new(task).wait().await, Err(UpdateError::Aborted));
    }

    #[tokio::test]
    async fn test_progress_taken_once() {
        let (_tx, rx) = mpsc::channel(1);
        let mut handle = UpdateHandle::new(tokio::spawn(async { Ok(()) })).with_progress(rx);
        assert!(handle.progress().is_some());
        assert!(handle.progress().is_none());
    }
}
