//! File sync engine: copy source files into every destination package.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexSet;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::change::{RecordStream, CHANNEL_CAPACITY};
use crate::error::{Error, Result};
use crate::glob::expand_files;
use crate::locator::LocatedPackages;
use crate::path_utils::{normalize, relative_to, resolve};

/// State of a single copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Pending,
    Success,
    Failure(String),
}

/// Result of copying one source file into one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResult {
    from: PathBuf,
    package: PathBuf,
    to: PathBuf,
    outcome: CopyOutcome,
}

impl CopyResult {
    pub fn new(
        from: impl Into<PathBuf>,
        package: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
    ) -> Self {
        Self {
            from: from.into(),
            package: package.into(),
            to: to.into(),
            outcome: CopyOutcome::Pending,
        }
    }

    pub fn with_success(self) -> Self {
        Self {
            outcome: CopyOutcome::Success,
            ..self
        }
    }

    pub fn with_failure(self, reason: impl Into<String>) -> Self {
        Self {
            outcome: CopyOutcome::Failure(reason.into()),
            ..self
        }
    }

    #[inline]
    pub fn from(&self) -> &Path {
        &self.from
    }

    /// Destination package directory.
    #[inline]
    pub fn package(&self) -> &Path {
        &self.package
    }

    #[inline]
    pub fn to(&self) -> &Path {
        &self.to
    }

    pub fn outcome(&self) -> &CopyOutcome {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome == CopyOutcome::Success
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            CopyOutcome::Failure(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for CopyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            CopyOutcome::Pending => write!(
                f,
                "Pending copy of {} to {}",
                self.from.display(),
                self.to.display()
            ),
            CopyOutcome::Success => write!(
                f,
                "Synchronized file {} to {}",
                self.from.display(),
                self.to.display()
            ),
            CopyOutcome::Failure(reason) => write!(
                f,
                "Could not synchronize file from {} to {}: {}",
                self.from.display(),
                self.to.display(),
                reason
            ),
        }
    }
}

/// Options controlling overwrite and simulation.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    pub force: bool,
    pub dry_run: bool,
    /// Directory that relative source patterns and paths are resolved against.
    pub invocation_dir: PathBuf,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            invocation_dir: PathBuf::from("."),
        }
    }
}

/// Reason attached to a copy refused because the destination exists.
pub fn overwrite_reason(to: &Path) -> String {
    format!(
        "Refusing to overwrite existing file {}; force required",
        to.display()
    )
}

/// Reason attached to a copy whose destination is the source itself, as when
/// the workspace root is also one of the packages.
pub fn same_file_reason(from: &Path) -> String {
    format!(
        "Source and destination are the same file: {}",
        from.display()
    )
}

/// Computes where `source` lands inside `package_dir`.
///
/// The source keeps its position relative to `base` (the monorepo root).
/// Relative inputs are resolved against `invocation_dir`, so the result never
/// depends on the process's current directory. A source outside `base` is
/// placed at the package root under its file name.
pub fn destination_path(
    source: &Path,
    package_dir: &Path,
    base: &Path,
    invocation_dir: &Path,
) -> PathBuf {
    let source = resolve(invocation_dir, source);
    let package_dir = package_root(package_dir, base, invocation_dir);
    let base = resolve(invocation_dir, base);

    let relative = relative_to(&source, &base);
    let escapes_base = relative
        .components()
        .next()
        .is_some_and(|c| c == Component::ParentDir)
        || relative.is_absolute();

    match (escapes_base, source.file_name()) {
        (true, Some(name)) => package_dir.join(name),
        _ => normalize(&package_dir.join(relative)),
    }
}

/// Resolves a package directory the way [`destination_path`] does.
pub fn package_root(package_dir: &Path, base: &Path, invocation_dir: &Path) -> PathBuf {
    resolve(&resolve(invocation_dir, base), package_dir)
}

/// Copies files matched by glob patterns into located packages.
#[derive(Debug, Clone, Default)]
pub struct FileSync {
    options: CopyOptions,
}

impl FileSync {
    pub fn new(options: CopyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Expands every pattern relative to the invocation directory.
    ///
    /// # Errors
    ///
    /// [`Error::NoSourceFiles`] for an empty pattern list and
    /// [`Error::NoFilesMatched`] for a pattern that matches nothing.
    pub fn sources<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<PathBuf>> {
        if patterns.is_empty() {
            return Err(Error::NoSourceFiles);
        }

        let mut sources = IndexSet::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let files = expand_files(pattern, &self.options.invocation_dir)?;
            if files.is_empty() {
                return Err(Error::NoFilesMatched {
                    pattern: pattern.to_string(),
                });
            }
            sources.extend(files);
        }

        Ok(sources.into_iter().collect())
    }

    /// Pairs every source file with every package, file-major.
    pub fn pair(&self, sources: &[PathBuf], packages: &LocatedPackages) -> Vec<CopyResult> {
        let invocation_dir = &self.options.invocation_dir;

        debug!(
            files = sources.len(),
            packages = packages.dirs.len(),
            force = self.options.force,
            "planning file copies"
        );

        sources
            .iter()
            .flat_map(|source| {
                packages.dirs.iter().map(move |package| {
                    let package_dir = package_root(package, &packages.base, invocation_dir);
                    let to = destination_path(source, package, &packages.base, invocation_dir);
                    CopyResult::new(source.clone(), package_dir, to)
                })
            })
            .collect()
    }

    /// Expands `patterns` and pairs the matches with `packages`.
    pub fn plan<S: AsRef<str>>(
        &self,
        patterns: &[S],
        packages: &LocatedPackages,
    ) -> Result<Vec<CopyResult>> {
        let sources = self.sources(patterns)?;
        Ok(self.pair(&sources, packages))
    }

    /// Performs planned copies one at a time on a background task.
    ///
    /// Conflicts arrive as failed [`CopyResult`]s; any other I/O error is sent
    /// as an `Err` item and ends the stream.
    pub fn copy_all(&self, plan: Vec<CopyResult>) -> RecordStream<CopyResult> {
        let options = self.options.clone();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            for pending in plan {
                let outcome = attempt(pending, &options).await;
                let fatal = outcome.is_err();
                if tx.send(outcome).await.is_err() || fatal {
                    return;
                }
            }
        });

        rx
    }

    /// Plans the copies, then performs them with [`FileSync::copy_all`].
    ///
    /// Pattern errors are returned before any copy is attempted.
    pub fn sync_files<S: AsRef<str>>(
        &self,
        patterns: &[S],
        packages: &LocatedPackages,
    ) -> Result<RecordStream<CopyResult>> {
        let plan = self.plan(patterns, packages)?;
        Ok(self.copy_all(plan))
    }
}

enum Attempt {
    Copied,
    Exists,
}

async fn attempt(pending: CopyResult, options: &CopyOptions) -> Result<CopyResult> {
    debug!(
        from = %pending.from().display(),
        to = %pending.to().display(),
        overwrite = options.force,
        dry_run = options.dry_run,
        "attempting copy"
    );

    let copy_err = |pending: &CopyResult, source: std::io::Error| Error::Copy {
        from: pending.from().to_path_buf(),
        to: pending.to().to_path_buf(),
        source,
    };

    if is_same_file(pending.from(), pending.to(), &options.invocation_dir).await {
        let reason = same_file_reason(pending.from());
        return Ok(pending.with_failure(reason));
    }

    if options.dry_run {
        if options.force {
            return Ok(pending.with_success());
        }
        return match tokio::fs::metadata(pending.to()).await {
            Ok(_) => {
                let reason = overwrite_reason(pending.to());
                Ok(pending.with_failure(reason))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(pending.with_success()),
            Err(e) => Err(copy_err(&pending, e)),
        };
    }

    match copy_file(pending.from(), pending.to(), options.force).await {
        Ok(Attempt::Copied) => Ok(pending.with_success()),
        Ok(Attempt::Exists) => {
            let reason = overwrite_reason(pending.to());
            Ok(pending.with_failure(reason))
        }
        Err(e) => Err(copy_err(&pending, e)),
    }
}

/// Lexical comparison first, then canonical paths so a symlinked package
/// directory pointing back at the source is caught too.
async fn is_same_file(from: &Path, to: &Path, invocation_dir: &Path) -> bool {
    let from = resolve(invocation_dir, from);
    let to = resolve(invocation_dir, to);
    if from == to {
        return true;
    }

    match (
        tokio::fs::canonicalize(&from).await,
        tokio::fs::canonicalize(&to).await,
    ) {
        (Ok(from), Ok(to)) => from == to,
        _ => false,
    }
}

async fn copy_file(from: &Path, to: &Path, overwrite: bool) -> std::io::Result<Attempt> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    if overwrite {
        tokio::fs::copy(from, to).await?;
        return Ok(Attempt::Copied);
    }

    let mut reader = tokio::fs::File::open(from).await?;
    let mut writer = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(Attempt::Exists),
        Err(e) => return Err(e),
    };

    tokio::io::copy(&mut reader, &mut writer).await?;
    writer.flush().await?;
    let permissions = reader.metadata().await?.permissions();
    writer.set_permissions(permissions).await?;

    Ok(Attempt::Copied)
}
