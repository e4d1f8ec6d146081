use crate::models::Model;
use std::collections::BTreeSet;

/// Per-run switches, built once from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Model names or digests to leave out of the run entirely
    pub skip: BTreeSet<String>,
    /// Ask before dispatching any update
    pub confirm: bool,
    /// Print a per-model table after checking
    pub verbose: bool,
    /// Dispatch all updates at once with per-model progress bars
    pub parallel: bool,
    /// Check and report only
    pub dry_run: bool,
}

impl RunOptions {
    /// Build the skip set from comma-separated `--skip` values
    #[must_use]
    pub fn parse_skip<I, S>(values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .flat_map(|value| {
                value
                    .as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// A model is skipped when either its name or its digest is listed
    #[must_use]
    pub fn is_skipped(&self, model: &Model) -> bool {
        self.skip.contains(&model.name) || self.skip.contains(&model.digest)
    }
}
