//! Shared file copies.

use anyhow::Result;
use pkgsync_core::{CopyOptions, CopyResult, CopyTally, FileSync, ProjectLocator};
use tracing::debug;

use crate::formatting::{print_copy_table, print_info, print_section_header, print_warning, SectionStyle};

use super::{Report, SyncOptions};

pub(crate) async fn sync_files(options: &SyncOptions, locator: &ProjectLocator) -> Result<Report> {
    let sync = FileSync::new(CopyOptions {
        force: options.force,
        dry_run: options.dry_run,
        invocation_dir: options.cwd.clone(),
    });

    let sources = sync.sources(options.files.as_slice())?;
    let packages = locator.locate_packages(options.packages.as_slice()).await?;
    debug!(base = %packages.base.display(), count = packages.dirs.len(), "located packages");

    let mut copies = sync.copy_all(sync.pair(&sources, &packages));
    let mut tally = CopyTally::new();
    let mut rows = Vec::new();

    while let Some(item) = copies.recv().await {
        let result = item?;
        if options.narrate() {
            narrate(&result);
            rows.push((
                result.from().display().to_string(),
                result.to().display().to_string(),
                result.is_success(),
            ));
        }
        tally.record(&result);
    }

    if options.verbose && !rows.is_empty() {
        print_section_header("File copies", SectionStyle::Primary);
        print_copy_table(&rows);
    }

    Ok(Report {
        summaries: tally.finish(),
        errors: 0,
    })
}

fn narrate(result: &CopyResult) {
    if result.is_success() {
        print_info(&result.to_string());
    } else {
        print_warning(&result.to_string());
    }
}
