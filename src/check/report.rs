use crate::check::{CheckOutcome, CheckStatus};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt;

/// Digest prefix length shown in tables, matching `ollama list`
const SHORT_DIGEST_LEN: usize = 12;

/// Counts across one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub checked: usize,
    pub up_to_date: usize,
    pub outdated: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    pub fn add(&mut self, status: CheckStatus) {
        self.checked += 1;
        match status {
            CheckStatus::UpToDate => self.up_to_date += 1,
            CheckStatus::UpdateAvailable => self.outdated += 1,
            CheckStatus::CheckFailed => self.failed += 1,
        }
    }

    #[must_use]
    pub fn from_outcomes(outcomes: &[CheckOutcome], skipped: usize) -> Self {
        let mut tally = Self {
            skipped,
            ..Self::default()
        };
        for outcome in outcomes {
            tally.add(outcome.status);
        }
        tally
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked, {} outdated, {} failed, {} skipped",
            self.checked, self.outdated, self.failed, self.skipped
        )
    }
}

/// Live progress for a batch of checks
///
/// Each outdated or failed model prints a notice above the bar as soon as
/// its outcome arrives. Notices are kept so callers can inspect them.
pub struct ProgressReporter {
    bar: ProgressBar,
    tally: Tally,
    notices: Vec<String>,
}

impl ProgressReporter {
    /// Reporter drawing to stderr
    #[must_use]
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message("checking models");
        Self::with_bar(bar)
    }

    /// Reporter with no bar; notices are still printed
    #[must_use]
    pub fn hidden(total: usize) -> Self {
        Self::with_bar(ProgressBar::with_draw_target(
            Some(total as u64),
            ProgressDrawTarget::hidden(),
        ))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            tally: Tally::default(),
            notices: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: &CheckOutcome) {
        self.tally.add(outcome.status);

        if let Some(notice) = outcome.notice() {
            // ProgressBar::println is a no-op when the bar is hidden
            self.bar.suspend(|| println!("{notice}"));
            self.notices.push(notice);
        }

        self.bar.inc(1);
        self.bar.set_message(format!(
            "{} outdated, {} failed",
            self.tally.outdated, self.tally.failed
        ));
    }

    #[must_use]
    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Clear the bar and hand back the notices
    #[must_use]
    pub fn finish(self) -> Vec<String> {
        self.bar.finish_and_clear();
        self.notices
    }
}

fn short_digest(digest: &str) -> &str {
    let digest = digest.strip_prefix("sha256:").unwrap_or(digest);
    digest
        .char_indices()
        .nth(SHORT_DIGEST_LEN)
        .map_or(digest, |(idx, _)| &digest[..idx])
}

/// Per-model table for `--verbose`; failed rows are included
#[must_use]
pub fn render_table(outcomes: &[CheckOutcome]) -> String {
    let headers = ["NAME", "STATUS", "LOCAL", "REMOTE", "DETAIL"];
    let rows: Vec<[String; 5]> = outcomes
        .iter()
        .map(|outcome| {
            [
                outcome.model.name.clone(),
                outcome.status.to_string(),
                short_digest(&outcome.model.digest).to_string(),
                short_digest(outcome.remote_digest_or_unknown()).to_string(),
                outcome.detail.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: [&str; 5]| -> String {
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
            if i + 1 == cells.len() {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{cell:<width$}  "));
            }
        }
        line.trim_end().to_string()
    };

    let mut table = format_row(headers);
    for row in &rows {
        table.push('\n');
        table.push_str(&format_row(row.each_ref().map(String::as_str)));
    }
    table
}
