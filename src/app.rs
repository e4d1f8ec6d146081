//! End-to-end run: list local models, check them, ask, update.

use crate::check::batch::BatchReport;
use crate::check::report::render_table;
use crate::check::{BatchCoordinator, StalenessChecker};
use crate::config::{Config, RunOptions, UpdateMethod};
use crate::error::{Result, SyncError, UpdateError};
use crate::models::{LocalRegistry, Model, OllamaLocalRegistry};
use crate::registry::{HttpManifestFetcher, ManifestFetcher};
use crate::update::{
    CommandUpdateAction, StreamingUpdateAction, UpdateAction, UpdateDispatcher, UpdateResult,
};
use chrono::Utc;
use std::sync::Arc;

/// Yes/no gate in front of the update phase
pub trait Confirmer: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Interactive terminal prompt, defaulting to "no"
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| SyncError::Prompt(e.to_string()))
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing outdated (including an empty local registry)
    UpToDate,
    /// Outdated models found, `--dry-run` set
    DryRun,
    /// Outdated models found, confirmation declined
    Declined,
    /// The update phase ran
    Updated,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: RunStatus,
    pub report: BatchReport,
    pub updates: Vec<UpdateResult>,
}

impl RunSummary {
    #[must_use]
    pub fn failed_updates(&self) -> Vec<&UpdateResult> {
        self.updates.iter().filter(|u| !u.succeeded()).collect()
    }

    /// 0 unless an update action failed; check failures alone stay 0
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.failed_updates().is_empty())
    }
}

/// Pick the update action configured in `[update]`
///
/// # Errors
/// - Returns error if the pull command is not in PATH
pub fn build_action(config: &Config) -> std::result::Result<Arc<dyn UpdateAction>, UpdateError> {
    let action: Arc<dyn UpdateAction> = match config.update.method {
        UpdateMethod::Command => Arc::new(CommandUpdateAction::new(&config.update.command)?),
        UpdateMethod::Stream => Arc::new(StreamingUpdateAction::new(&config.local.host)),
    };
    Ok(action)
}

/// Builds the update action when the update phase is reached
pub type ActionFactory =
    Box<dyn Fn() -> std::result::Result<Arc<dyn UpdateAction>, UpdateError> + Send + Sync>;

enum ActionSource {
    Ready(Arc<dyn UpdateAction>),
    Deferred(ActionFactory),
}

impl ActionSource {
    fn resolve(&self) -> std::result::Result<Arc<dyn UpdateAction>, UpdateError> {
        match self {
            Self::Ready(action) => Ok(Arc::clone(action)),
            Self::Deferred(factory) => factory(),
        }
    }
}

/// The whole check-and-update workflow
pub struct Updater {
    local: Arc<dyn LocalRegistry>,
    checker: StalenessChecker,
    action: ActionSource,
    confirmer: Box<dyn Confirmer>,
    options: RunOptions,
    concurrency_limit: usize,
    show_progress: bool,
}

impl Updater {
    #[must_use]
    pub fn new(
        local: Arc<dyn LocalRegistry>,
        fetcher: Arc<dyn ManifestFetcher>,
        action: Arc<dyn UpdateAction>,
        options: RunOptions,
    ) -> Self {
        Self::with_action_source(local, fetcher, ActionSource::Ready(action), options)
    }

    /// Like [`Updater::new`], but the action is only built if something needs updating
    #[must_use]
    pub fn deferred(
        local: Arc<dyn LocalRegistry>,
        fetcher: Arc<dyn ManifestFetcher>,
        factory: ActionFactory,
        options: RunOptions,
    ) -> Self {
        Self::with_action_source(local, fetcher, ActionSource::Deferred(factory), options)
    }

    /// Wire the Ollama server, the HTTP registry and the configured action
    #[must_use]
    pub fn from_config(config: &Config, options: RunOptions) -> Self {
        let local = Arc::new(OllamaLocalRegistry::new(
            &config.local.host,
            config.registry.timeout(),
        ));
        let fetcher = Arc::new(HttpManifestFetcher::new(&config.registry));
        let action_config = config.clone();

        Self::deferred(
            local,
            fetcher,
            Box::new(move || build_action(&action_config)),
            options,
        )
        .with_concurrency_limit(config.registry.max_concurrent_checks)
    }

    fn with_action_source(
        local: Arc<dyn LocalRegistry>,
        fetcher: Arc<dyn ManifestFetcher>,
        action: ActionSource,
        options: RunOptions,
    ) -> Self {
        Self {
            local,
            checker: StalenessChecker::new(fetcher),
            action,
            confirmer: Box::new(TerminalConfirmer),
            options,
            concurrency_limit: 0,
            show_progress: true,
        }
    }

    #[must_use]
    pub fn with_confirmer(mut self, confirmer: Box<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    #[must_use]
    pub const fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run once
    ///
    /// # Errors
    /// - Returns error if the local registry cannot be listed
    /// - Returns error if the confirmation prompt fails
    pub async fn run(&self) -> Result<RunSummary> {
        let models = self.local.list_models().await?;

        if models.is_empty() {
            println!("No models installed, nothing to check");
            println!("All models are up to date");
            return Ok(self.finish(RunStatus::UpToDate, BatchReport::default()));
        }

        let report = BatchCoordinator::new(self.checker.clone())
            .with_concurrency_limit(self.concurrency_limit)
            .with_progress(self.show_progress)
            .run(models, &self.options)
            .await;

        if self.options.verbose {
            println!("{}", render_table(&report.outcomes));
        }
        println!("{}", report.tally());

        let outdated = report.outdated();
        if outdated.is_empty() {
            println!("All models are up to date");
            return Ok(self.finish(RunStatus::UpToDate, report));
        }

        if self.options.dry_run {
            println!("{} models can be updated (dry run)", outdated.len());
            return Ok(self.finish(RunStatus::DryRun, report));
        }

        if self.options.confirm {
            let prompt = format!("Update {} outdated models?", outdated.len());
            if !self.confirmer.confirm(&prompt)? {
                println!("Update cancelled");
                return Ok(self.finish(RunStatus::Declined, report));
            }
        }

        let updates = match self.action.resolve() {
            Ok(action) => {
                UpdateDispatcher::new(action, self.options.parallel)
                    .with_progress(self.show_progress)
                    .dispatch(&outdated)
                    .await
            }
            Err(e) => {
                tracing::error!("Cannot update: {e}");
                unavailable(&outdated, &e)
            }
        };

        let failed = updates.iter().filter(|u| !u.succeeded()).count();
        println!("{} updated, {failed} failed", updates.len() - failed);

        Ok(RunSummary {
            status: RunStatus::Updated,
            report,
            updates,
        })
    }

    fn finish(&self, status: RunStatus, report: BatchReport) -> RunSummary {
        tracing::info!("Run finished: {status:?}");
        RunSummary {
            status,
            report,
            updates: Vec::new(),
        }
    }
}

/// One failed result per model when no action could be built
fn unavailable(models: &[Model], error: &UpdateError) -> Vec<UpdateResult> {
    let now = Utc::now();
    models
        .iter()
        .map(|model| {
            println!("✗ Failed to update {}: {error}", model.name);
            UpdateResult {
                model: model.name.clone(),
                error: Some(error.to_string()),
                progress: None,
                started_at: now,
                finished_at: now,
            }
        })
        .collect()
}
