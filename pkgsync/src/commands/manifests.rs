//! Manifest field sync.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use pkgsync_core::manifest::{find_manifest_upwards, MANIFEST_FILE};
use pkgsync_core::path_utils::resolve;
use pkgsync_core::{
    ChangeEngine, ChangeRecord, ChangeTally, Error, FailurePolicy, Manifest, ProjectLocator,
};
use serde_json::Value;
use tracing::debug;

use crate::formatting::{print_change_table, print_error, print_section_header, SectionStyle, Status};

use super::{Report, SyncOptions};

pub(crate) async fn sync_manifests(
    options: &SyncOptions,
    locator: &ProjectLocator,
) -> Result<Report> {
    let source_path = find_source(options.source.as_deref(), &options.cwd).await?;
    let source = Manifest::load(&source_path).await?;
    debug!(path = %source_path.display(), "loaded source manifest");

    let destinations = locator
        .locate_manifests(options.packages.as_slice(), Some(&source_path))
        .await?;

    let engine = ChangeEngine::new(options.fields.clone())
        .with_failure_policy(options.policy)
        .with_max_concurrency(options.parallel);
    let mut changes = engine.sync_manifests(Arc::new(source), destinations, options.dry_run);

    let mut tally = ChangeTally::new();
    let mut rows = Vec::new();
    let mut errors = 0;

    while let Some(item) = changes.recv().await {
        match item {
            Ok(record) => {
                if options.narrate() {
                    narrate(&record);
                    rows.push((
                        record.path().display().to_string(),
                        record.fields().into_iter().collect(),
                        record.operations(),
                    ));
                }
                tally.record(&record);
            }
            Err(e) if options.policy == FailurePolicy::Isolate => {
                print_error(&e.to_string());
                errors += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if options.verbose && !rows.is_empty() {
        print_section_header("Manifest changes", SectionStyle::Primary);
        print_change_table(&rows);
    }

    Ok(Report {
        summaries: vec![tally.finish()],
        errors,
    })
}

/// `--source` may name a directory or a manifest; otherwise the nearest
/// `package.json` at or above the working directory is used.
async fn find_source(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf, Error> {
    match explicit {
        Some(path) => {
            let path = resolve(cwd, path);
            let path = match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_dir() => path.join(MANIFEST_FILE),
                _ => path,
            };
            match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => Ok(path),
                _ => Err(Error::SourceManifestNotFound(path)),
            }
        }
        None => find_manifest_upwards(cwd)
            .await
            .ok_or_else(|| Error::SourceManifestNotFound(cwd.to_path_buf())),
    }
}

fn narrate(record: &ChangeRecord) {
    for change in record.field_changes() {
        println!(
            "{}",
            Status::Info.format(&format!(
                "{} - Synchronized field \"{}\": {} => {}",
                record.path().display(),
                change.field,
                inspect(change.before),
                inspect(change.after)
            ))
        );
    }
}

fn inspect(value: Option<&Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "(absent)".to_string(),
    }
}
