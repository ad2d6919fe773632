//! Manifest change engine: diff destination manifests against the source and
//! apply the resulting patches.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexSet;
use json_patch::Patch;
use serde_json::Value;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fields::FieldSet;
use crate::manifest::{normalize_manifest_path, Manifest};
use crate::patch::{apply_patch, compute_patch, describe, is_empty, touched_fields};
use crate::path_utils::normalize;

/// Stream of per-target outcomes. Closing the channel marks the end of a run.
pub type RecordStream<T> = mpsc::Receiver<Result<T>>;

pub(crate) const CHANNEL_CAPACITY: usize = 64;

/// What the engine does after a destination fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Emit the error and stop processing further destinations.
    #[default]
    Abort,
    /// Emit the error and keep processing the remaining destinations.
    Isolate,
}

/// A pending or applied patch for one destination manifest.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    path: PathBuf,
    patch: Patch,
    original: Arc<Manifest>,
    updated: Option<Arc<Manifest>>,
}

/// Before/after values of one synchronized field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange<'a> {
    pub field: String,
    pub before: Option<&'a Value>,
    pub after: Option<&'a Value>,
}

impl ChangeRecord {
    /// Returns `None` for an empty patch; such records never leave the diff step.
    pub fn new(path: impl Into<PathBuf>, patch: Patch, original: Arc<Manifest>) -> Option<Self> {
        if is_empty(&patch) {
            return None;
        }
        Some(Self {
            path: path.into(),
            patch,
            original,
            updated: None,
        })
    }

    /// Returns a copy of the record carrying the patched manifest.
    pub fn with_updated(self, updated: Manifest) -> Self {
        Self {
            updated: Some(Arc::new(updated)),
            ..self
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn original(&self) -> &Manifest {
        &self.original
    }

    pub fn updated(&self) -> Option<&Manifest> {
        self.updated.as_deref()
    }

    pub fn is_applied(&self) -> bool {
        self.updated.is_some()
    }

    pub fn fields(&self) -> IndexSet<String> {
        touched_fields(&self.patch)
    }

    pub fn operations(&self) -> Vec<String> {
        describe(&self.patch)
    }

    /// Per-field before/after values. Empty until the record has been applied.
    pub fn field_changes(&self) -> Vec<FieldChange<'_>> {
        let Some(updated) = self.updated.as_deref() else {
            return Vec::new();
        };

        self.fields()
            .into_iter()
            .map(|field| FieldChange {
                before: self.original.get(&field),
                after: updated.get(&field),
                field,
            })
            .collect()
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.fields().into_iter().collect();
        write!(
            f,
            "{} - {} field(s) out of sync: {}",
            self.path.display(),
            fields.len(),
            fields.join(", ")
        )
    }
}

/// Computes and applies field patches from a source manifest to destinations.
#[derive(Debug, Clone)]
pub struct ChangeEngine {
    fields: Arc<FieldSet>,
    policy: FailurePolicy,
    max_concurrency: Option<usize>,
}

impl ChangeEngine {
    pub fn new(fields: FieldSet) -> Self {
        Self {
            fields: Arc::new(fields),
            policy: FailurePolicy::default(),
            max_concurrency: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Caps the number of destination manifests read at the same time.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Diffs every destination against `source`.
    ///
    /// Destinations are de-duplicated first and the source's own manifest is
    /// skipped, so each path yields at most one record. Records arrive in
    /// completion order. Must be called from within a tokio runtime.
    pub fn compute_changes(
        &self,
        source: Arc<Manifest>,
        destinations: Vec<PathBuf>,
    ) -> RecordStream<ChangeRecord> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let targets = unique_targets(destinations, source.path());
        let source_view = Arc::new(source.restrict(&self.fields));
        let fields = Arc::clone(&self.fields);
        let policy = self.policy;
        let limit = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n.max(1))));

        debug!(destinations = targets.len(), "computing manifest changes");

        tokio::spawn(async move {
            let mut tasks = JoinSet::new();
            for path in targets {
                let fields = Arc::clone(&fields);
                let source_view = Arc::clone(&source_view);
                let limit = limit.clone();
                tasks.spawn(async move {
                    let _permit = match limit {
                        Some(semaphore) => Some(
                            semaphore
                                .acquire_owned()
                                .await
                                .map_err(|e| Error::TaskJoin(e.to_string()))?,
                        ),
                        None => None,
                    };
                    diff_destination(path, &fields, &source_view).await
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined.map_err(Error::from).and_then(|outcome| outcome) {
                    Ok(Some(record)) => {
                        if tx.send(Ok(record)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let abort = policy == FailurePolicy::Abort;
                        if !abort {
                            warn!(error = %e, "skipping destination");
                        }
                        if tx.send(Err(e)).await.is_err() || abort {
                            tasks.abort_all();
                            return;
                        }
                    }
                }
            }
        });

        rx
    }

    /// Applies each record's patch and, unless `dry_run`, persists the result.
    ///
    /// Every forwarded record carries its resulting manifest, including in
    /// dry-run mode.
    pub fn apply_changes(
        &self,
        mut changes: RecordStream<ChangeRecord>,
        dry_run: bool,
    ) -> RecordStream<ChangeRecord> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let policy = self.policy;

        tokio::spawn(async move {
            while let Some(item) = changes.recv().await {
                let outcome = match item {
                    Ok(record) => apply_record(record, dry_run).await,
                    Err(e) => Err(e),
                };
                let stop = outcome.is_err() && policy == FailurePolicy::Abort;
                if tx.send(outcome).await.is_err() || stop {
                    return;
                }
            }
        });

        rx
    }

    /// Diff followed by apply.
    pub fn sync_manifests(
        &self,
        source: Arc<Manifest>,
        destinations: Vec<PathBuf>,
        dry_run: bool,
    ) -> RecordStream<ChangeRecord> {
        let changes = self.compute_changes(source, destinations);
        self.apply_changes(changes, dry_run)
    }
}

fn unique_targets(destinations: Vec<PathBuf>, source: &Path) -> Vec<PathBuf> {
    let source = normalize(source);
    let unique: IndexSet<PathBuf> = destinations
        .iter()
        .map(|path| normalize(&normalize_manifest_path(path)))
        .filter(|path| *path != source)
        .collect();
    unique.into_iter().collect()
}

async fn diff_destination(
    path: PathBuf,
    fields: &FieldSet,
    source_view: &Value,
) -> Result<Option<ChangeRecord>> {
    let manifest = Manifest::load(&path).await?;
    let patch = compute_patch(&manifest.restrict(fields), source_view);

    if is_empty(&patch) {
        debug!(path = %path.display(), "manifest up to date");
        return Ok(None);
    }

    debug!(path = %path.display(), operations = patch.0.len(), "manifest out of sync");
    Ok(ChangeRecord::new(path, patch, Arc::new(manifest)))
}

async fn apply_record(record: ChangeRecord, dry_run: bool) -> Result<ChangeRecord> {
    let fields = apply_patch(record.path(), record.original().fields(), record.patch())?;
    let updated = record.original().with_fields(fields);

    if dry_run {
        debug!(path = %record.path().display(), "dry run; not writing manifest");
    } else {
        updated.save().await?;
        info!(path = %record.path().display(), "wrote manifest");
    }

    Ok(record.with_updated(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_targets_dedupes_and_skips_source() {
        let targets = unique_targets(
            vec![
                PathBuf::from("/repo/packages/a"),
                PathBuf::from("/repo/packages/a/package.json"),
                PathBuf::from("/repo/packages/./b/package.json"),
                PathBuf::from("/repo/package.json"),
            ],
            Path::new("/repo/package.json"),
        );
        assert_eq!(
            targets,
            vec![
                PathBuf::from("/repo/packages/a/package.json"),
                PathBuf::from("/repo/packages/b/package.json"),
            ]
        );
    }
}
