//! Folding record streams into user-facing summaries.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexSet;

use crate::change::{ChangeRecord, RecordStream};
use crate::copy::{CopyOutcome, CopyResult};
use crate::error::Result;

/// One line of end-of-run output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Success(String),
    Failure(String),
    Noop(String),
}

impl Summary {
    pub fn message(&self) -> &str {
        match self {
            Summary::Success(message) | Summary::Failure(message) | Summary::Noop(message) => {
                message
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Summary::Failure(_))
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Counts distinct manifests that received a resulting snapshot.
#[derive(Debug, Default)]
pub struct ChangeTally {
    synced: IndexSet<PathBuf>,
}

impl ChangeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records without a resulting manifest (not yet applied) are ignored.
    pub fn record(&mut self, record: &ChangeRecord) {
        if record.is_applied() {
            self.synced.insert(record.path().to_path_buf());
        }
    }

    pub fn count(&self) -> usize {
        self.synced.len()
    }

    pub fn finish(self) -> Summary {
        match self.synced.len() {
            0 => Summary::Noop(
                "No package manifest changes needed; everything up-to-date!".to_string(),
            ),
            n => Summary::Success(format!("Synced {} package manifest file(s)", n)),
        }
    }
}

#[derive(Debug, Default)]
struct Partition {
    files: IndexSet<PathBuf>,
    copies: usize,
}

impl Partition {
    fn add(&mut self, result: &CopyResult) {
        self.files.insert(result.from().to_path_buf());
        self.copies += 1;
    }
}

/// Partitions copy results by outcome.
///
/// Each partition reports its distinct source files and its total number of
/// copies, which is what the summary calls packages.
#[derive(Debug, Default)]
pub struct CopyTally {
    succeeded: Partition,
    failed: Partition,
}

impl CopyTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending results are not counted.
    pub fn record(&mut self, result: &CopyResult) {
        match result.outcome() {
            CopyOutcome::Success => self.succeeded.add(result),
            CopyOutcome::Failure(_) => self.failed.add(result),
            CopyOutcome::Pending => {}
        }
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.copies
    }

    pub fn failed(&self) -> usize {
        self.failed.copies
    }

    pub fn finish(self) -> Vec<Summary> {
        let mut summaries = Vec::new();

        if self.succeeded.copies > 0 {
            summaries.push(Summary::Success(format!(
                "Copied {} file(s) to {} package(s)",
                self.succeeded.files.len(),
                self.succeeded.copies
            )));
        }

        if self.failed.copies > 0 {
            summaries.push(Summary::Failure(format!(
                "Failed to copy {} file(s) to {} package(s); see verbose output",
                self.failed.files.len(),
                self.failed.copies
            )));
        }

        if summaries.is_empty() {
            summaries.push(Summary::Noop("No files copied.".to_string()));
        }

        summaries
    }
}

/// Drains a change stream into a single summary.
///
/// The first `Err` item ends the fold and is returned.
pub async fn summarize_changes(mut changes: RecordStream<ChangeRecord>) -> Result<Summary> {
    let mut tally = ChangeTally::new();
    while let Some(item) = changes.recv().await {
        tally.record(&item?);
    }
    Ok(tally.finish())
}

/// Drains a copy stream into success and failure summaries.
pub async fn summarize_copies(mut copies: RecordStream<CopyResult>) -> Result<Vec<Summary>> {
    let mut tally = CopyTally::new();
    while let Some(item) = copies.recv().await {
        tally.record(&item?);
    }
    Ok(tally.finish())
}
