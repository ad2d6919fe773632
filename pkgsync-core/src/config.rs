//! `pkgsync.toml` configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::FieldSet;

pub const CONFIG_FILE: &str = "pkgsync.toml";

/// Defaults for a sync run, read from the `[sync]` table.
///
/// Every key is optional; command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub fields: Option<Vec<String>>,
    pub packages: Option<Vec<String>>,
    pub files: Option<Vec<String>>,
    pub source: Option<PathBuf>,
    pub lerna: Option<PathBuf>,
    pub force: Option<bool>,
    /// Path of the file this was read from (for resolving relative paths).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    sync: SyncConfig,
}

impl SyncConfig {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|error| Error::Toml {
            error,
            context: path.display().to_string(),
        })?;

        let mut config = file.sync;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Walks up from `start` looking for `pkgsync.toml`.
    ///
    /// The search stops at the first directory containing `.git`.
    pub fn discover(start: &Path) -> Result<Option<Self>> {
        let mut current_dir = start;

        loop {
            let candidate = current_dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }

            if current_dir.join(".git").exists() {
                break;
            }

            match current_dir.parent() {
                Some(parent) if parent != current_dir => current_dir = parent,
                _ => break,
            }
        }

        Ok(None)
    }

    /// Directory of the config file; relative entries are resolved against it.
    pub fn root(&self) -> Option<&Path> {
        self.config_path.as_deref().and_then(Path::parent)
    }

    pub fn field_set(&self) -> Option<FieldSet> {
        self.fields.as_ref().map(|fields| fields.iter().cloned().collect())
    }

    pub fn source_path(&self) -> Option<PathBuf> {
        self.source.as_deref().map(|p| self.anchor_path(p))
    }

    pub fn lerna_path(&self) -> Option<PathBuf> {
        self.lerna.as_deref().map(|p| self.anchor_path(p))
    }

    /// Package globs made absolute against the config directory.
    pub fn package_patterns(&self) -> Option<Vec<String>> {
        self.packages.as_ref().map(|patterns| self.anchor_patterns(patterns))
    }

    /// File globs made absolute against the config directory.
    pub fn file_patterns(&self) -> Option<Vec<String>> {
        self.files.as_ref().map(|patterns| self.anchor_patterns(patterns))
    }

    fn anchor_path(&self, path: &Path) -> PathBuf {
        match self.root() {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn anchor_patterns(&self, patterns: &[String]) -> Vec<String> {
        patterns.iter().map(|p| self.anchor_pattern(p)).collect()
    }

    fn anchor_pattern(&self, pattern: &str) -> String {
        if let Some(negated) = pattern.strip_prefix('!') {
            return format!("!{}", self.anchor_pattern(negated));
        }
        self.anchor_path(Path::new(pattern))
            .to_string_lossy()
            .into_owned()
    }
}
