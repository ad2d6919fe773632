use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pkgsync_core::adapter::{WorkspaceAdapter, WorkspaceGlobs};
use pkgsync_core::error::{Error, Result};
use pkgsync_core::path_utils::{find_upwards, resolve};
use serde::Deserialize;
use tracing::debug;

pub const LERNA_JSON: &str = "lerna.json";

#[derive(Debug, Deserialize)]
struct LernaJson {
    #[serde(default)]
    packages: Vec<String>,
}

/// Reads package globs from `lerna.json`.
///
/// Without an explicit path the nearest `lerna.json` at or above the working
/// directory is used.
#[derive(Debug, Clone, Default)]
pub struct LernaAdapter {
    config_path: Option<PathBuf>,
}

impl LernaAdapter {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }
}

#[async_trait]
impl WorkspaceAdapter for LernaAdapter {
    fn name(&self) -> &'static str {
        "lerna"
    }

    fn cache_key(&self) -> String {
        self.config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    async fn locate(&self, cwd: &Path) -> Result<Option<WorkspaceGlobs>> {
        let config_path = match &self.config_path {
            Some(path) => resolve(cwd, path),
            None => match find_upwards(cwd, LERNA_JSON).await {
                Some(path) => path,
                None => {
                    debug!(cwd = %cwd.display(), "no lerna.json found");
                    return Ok(None);
                }
            },
        };

        let content = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|e| Error::WorkspaceConfig {
                path: config_path.clone(),
                message: format!("Failed to read {}: {}", LERNA_JSON, e),
            })?;

        let lerna: LernaJson =
            serde_json::from_str(&content).map_err(|e| Error::WorkspaceConfig {
                path: config_path.clone(),
                message: format!("Failed to parse {}: {}", LERNA_JSON, e),
            })?;

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());

        debug!(path = %config_path.display(), packages = ?lerna.packages, "read lerna.json");

        Ok(Some(WorkspaceGlobs {
            root,
            config_path,
            patterns: lerna.packages,
        }))
    }
}
