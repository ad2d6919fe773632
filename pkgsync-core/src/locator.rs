//! Project locator: resolves destination package directories and manifests.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use indexmap::IndexSet;
use tracing::debug;

use crate::adapter::{WorkspaceAdapter, WorkspaceGlobs};
use crate::error::{Error, Result};
use crate::glob::expand_dirs;
use crate::manifest::MANIFEST_FILE;
use crate::path_utils::normalize;

/// Package directories plus the root they were declared relative to.
///
/// `base` anchors the destination of copied files: a file at `base/x`
/// lands at `dir/x` in every package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedPackages {
    pub base: PathBuf,
    pub dirs: Vec<PathBuf>,
}

impl LocatedPackages {
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Finds destination packages from explicit globs or workspace configuration.
///
/// Adapter lookups are memoized per working directory, so the manifest and
/// file pipelines of one run share a single read of each config file.
pub struct ProjectLocator {
    cwd: PathBuf,
    adapters: Vec<Box<dyn WorkspaceAdapter>>,
    cache: DashMap<String, Option<WorkspaceGlobs>>,
}

impl ProjectLocator {
    pub fn new(cwd: impl Into<PathBuf>, adapters: Vec<Box<dyn WorkspaceAdapter>>) -> Self {
        Self {
            cwd: cwd.into(),
            adapters,
            cache: DashMap::new(),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn cached_lookups(&self) -> usize {
        self.cache.len()
    }

    /// Resolves package directories.
    ///
    /// Explicit globs win and are expanded relative to the working directory.
    /// Otherwise every adapter is consulted and the results are merged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoWorkspaceConfig`] when no explicit globs are given
    /// and no adapter finds a configuration.
    pub async fn locate_packages<S: AsRef<str>>(&self, explicit: &[S]) -> Result<LocatedPackages> {
        self.locate_from(explicit, None).await
    }

    async fn locate_from<S: AsRef<str>>(
        &self,
        explicit: &[S],
        source_dir: Option<&Path>,
    ) -> Result<LocatedPackages> {
        if !explicit.is_empty() {
            let dirs = expand_dirs(explicit, &self.cwd)?;
            debug!(count = dirs.len(), "found packages from explicit globs");
            return Ok(LocatedPackages {
                base: self.cwd.clone(),
                dirs,
            });
        }

        let mut base = None;
        let mut dirs = IndexSet::new();
        let mut found_config = false;

        for adapter in &self.adapters {
            let start = match source_dir {
                Some(dir) if adapter.follows_source() => dir,
                _ => self.cwd.as_path(),
            };
            let Some(globs) = self.workspace_globs(adapter.as_ref(), start).await? else {
                continue;
            };
            found_config = true;
            debug!(
                adapter = adapter.name(),
                config = %globs.config_path.display(),
                patterns = ?globs.patterns,
                "found workspace config"
            );
            base.get_or_insert_with(|| globs.root.clone());
            dirs.extend(expand_dirs(&globs.patterns, &globs.root)?);
        }

        if !found_config {
            return Err(Error::NoWorkspaceConfig {
                cwd: self.cwd.clone(),
            });
        }

        Ok(LocatedPackages {
            base: base.unwrap_or_else(|| self.cwd.clone()),
            dirs: dirs.into_iter().collect(),
        })
    }

    /// Resolves `package.json` paths of the located packages.
    ///
    /// Directories without a manifest are skipped, as is `source`. Adapters
    /// that follow the source look for their config from its directory.
    pub async fn locate_manifests<S: AsRef<str>>(
        &self,
        explicit: &[S],
        source: Option<&Path>,
    ) -> Result<Vec<PathBuf>> {
        let source = source.map(|path| normalize(&self.cwd.join(path)));
        let source_dir = source.as_deref().and_then(Path::parent);
        let located = self.locate_from(explicit, source_dir).await?;
        let mut manifests = Vec::with_capacity(located.dirs.len());

        for dir in &located.dirs {
            let manifest = normalize(&dir.join(MANIFEST_FILE));
            if source.as_ref() == Some(&manifest) {
                continue;
            }
            let is_file = tokio::fs::metadata(&manifest)
                .await
                .is_ok_and(|metadata| metadata.is_file());
            if is_file {
                debug!(path = %manifest.display(), "found package manifest");
                manifests.push(manifest);
            }
        }

        Ok(manifests)
    }

    async fn workspace_globs(
        &self,
        adapter: &dyn WorkspaceAdapter,
        start: &Path,
    ) -> Result<Option<WorkspaceGlobs>> {
        let key = format!(
            "{}:{}:{}",
            adapter.name(),
            start.display(),
            adapter.cache_key()
        );

        if let Some(cached) = self.cache.get(&key) {
            debug!(key = %key, "workspace config cache hit");
            return Ok(cached.clone());
        }

        let found = adapter.locate(start).await?;
        self.cache.insert(key, found.clone());
        Ok(found)
    }
}
