//! Workspace adapter trait for reading monorepo package declarations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// Package globs declared by one workspace configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceGlobs {
    /// Directory the globs are relative to.
    pub root: PathBuf,
    /// File the globs were read from.
    pub config_path: PathBuf,
    pub patterns: Vec<String>,
}

/// Trait for workspace-configuration formats (`lerna.json`, npm workspaces).
///
/// Adapters only report which package globs a configuration declares; glob
/// expansion and de-duplication happen in the locator.
#[async_trait]
pub trait WorkspaceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extra input that changes what `locate` returns for the same `cwd`,
    /// such as an explicit config path. Part of the locator's cache key.
    fn cache_key(&self) -> String {
        String::new()
    }

    /// Whether manifest lookups start from the source manifest's directory
    /// instead of the working directory.
    fn follows_source(&self) -> bool {
        false
    }

    /// Finds the adapter's configuration starting from `cwd`.
    ///
    /// Returns `Ok(None)` when no configuration exists.
    async fn locate(&self, cwd: &Path) -> Result<Option<WorkspaceGlobs>>;
}
