use std::path::Path;

use async_trait::async_trait;
use pkgsync_core::adapter::{WorkspaceAdapter, WorkspaceGlobs};
use pkgsync_core::error::{Error, Result};
use pkgsync_core::manifest::find_manifest_upwards;
use serde::Deserialize;
use tracing::debug;

/// `workspaces` is either a list of globs or, for Yarn, `{ "packages": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Workspaces {
    Globs(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    workspaces: Option<Workspaces>,
}

/// Reads the `workspaces` field of the nearest `package.json` that has one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpmWorkspacesAdapter;

#[async_trait]
impl WorkspaceAdapter for NpmWorkspacesAdapter {
    fn name(&self) -> &'static str {
        "workspaces"
    }

    fn follows_source(&self) -> bool {
        true
    }

    async fn locate(&self, cwd: &Path) -> Result<Option<WorkspaceGlobs>> {
        let mut search_from = Some(cwd.to_path_buf());

        while let Some(dir) = search_from.take() {
            let Some(config_path) = find_manifest_upwards(&dir).await else {
                break;
            };

            let root = config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.clone());

            match read_workspaces(&config_path).await? {
                Some(patterns) => {
                    debug!(path = %config_path.display(), workspaces = ?patterns, "read package.json workspaces");
                    return Ok(Some(WorkspaceGlobs {
                        root,
                        config_path,
                        patterns,
                    }));
                }
                None => {
                    debug!(path = %config_path.display(), "package.json declares no workspaces");
                    search_from = root.parent().map(Path::to_path_buf);
                }
            }
        }

        Ok(None)
    }
}

async fn read_workspaces(config_path: &Path) -> Result<Option<Vec<String>>> {
    let content = tokio::fs::read_to_string(config_path)
        .await
        .map_err(|e| Error::WorkspaceConfig {
            path: config_path.to_path_buf(),
            message: format!("Failed to read package.json: {}", e),
        })?;

    let package: PackageJson =
        serde_json::from_str(&content).map_err(|e| Error::WorkspaceConfig {
            path: config_path.to_path_buf(),
            message: format!("Failed to parse package.json: {}", e),
        })?;

    Ok(package.workspaces.map(|workspaces| match workspaces {
        Workspaces::Globs(globs) => globs,
        Workspaces::Object { packages } => packages,
    }))
}
