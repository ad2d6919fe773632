//! Command implementations for the CLI.

mod files;
mod manifests;

use std::path::PathBuf;

use anyhow::Result;
use pkgsync_adapters::default_adapters;
use pkgsync_core::{FailurePolicy, FieldSet, ProjectLocator, Summary};

use crate::formatting::{
    print_dry_run_banner, print_section_header, print_success, print_summary, SectionStyle,
};

/// Everything a sync run needs, after merging flags and `pkgsync.toml`.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub cwd: PathBuf,
    pub source: Option<PathBuf>,
    pub packages: Vec<String>,
    pub fields: FieldSet,
    pub files: Vec<String>,
    pub lerna: Option<PathBuf>,
    pub dry_run: bool,
    pub force: bool,
    pub sync_manifests: bool,
    pub summary: bool,
    pub verbose: bool,
    pub policy: FailurePolicy,
    pub parallel: Option<usize>,
}

impl SyncOptions {
    /// Dry runs always narrate.
    fn narrate(&self) -> bool {
        self.verbose || self.dry_run
    }

    /// With manifest sync disabled the file pipeline runs even without files,
    /// so an empty invocation reports "No files to sync!".
    fn sync_files(&self) -> bool {
        !self.files.is_empty() || !self.sync_manifests
    }
}

/// What one pipeline produced.
pub(crate) struct Report {
    summaries: Vec<Summary>,
    /// Destinations that failed under `FailurePolicy::Isolate`.
    errors: usize,
}

/// Runs the manifest and file pipelines.
///
/// Returns `Ok(false)` when the run completed but isolated failures occurred.
pub fn cmd_sync(options: SyncOptions) -> Result<bool> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;
    rt.block_on(run_sync(options))
}

async fn run_sync(options: SyncOptions) -> Result<bool> {
    let locator = ProjectLocator::new(&options.cwd, default_adapters(options.lerna.clone()));

    if options.dry_run {
        print_dry_run_banner();
    }

    let (manifest_report, file_report) = tokio::join!(
        async {
            if options.sync_manifests {
                manifests::sync_manifests(&options, &locator).await.map(Some)
            } else {
                Ok(None)
            }
        },
        async {
            if options.sync_files() {
                files::sync_files(&options, &locator).await.map(Some)
            } else {
                Ok(None)
            }
        },
    );

    let mut reports = Vec::new();
    let mut first_error = None;
    for outcome in [manifest_report, file_report] {
        match outcome {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    if options.summary {
        for report in &reports {
            for summary in &report.summaries {
                print_summary(summary);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    let errors: usize = reports.iter().map(|r| r.errors).sum();
    if errors > 0 {
        print_section_header(
            &format!("{} destination(s) failed; see errors above", errors),
            SectionStyle::Warning,
        );
    }

    print_success("Done!");
    if options.dry_run {
        print_dry_run_banner();
    }

    Ok(errors == 0)
}
