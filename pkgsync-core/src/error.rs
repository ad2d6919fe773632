//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("Could not read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No lerna.json or package.json workspaces found from {cwd}. Use --package to name destination packages.")]
    NoWorkspaceConfig { cwd: PathBuf },

    #[error("Invalid workspace config {path}: {message}")]
    WorkspaceConfig { path: PathBuf, message: String },

    #[error("Could not find a source package.json from {0}. Use --source to name one.")]
    SourceManifestNotFound(PathBuf),

    #[error("No files to sync!")]
    NoSourceFiles,

    #[error("Could not find any files matching glob \"{pattern}\"")]
    NoFilesMatched { pattern: String },

    #[error("Invalid glob \"{pattern}\": {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Could not read {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed manifest {path}: {message}")]
    MalformedManifest { path: PathBuf, message: String },

    #[error("Could not write {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not apply patch to {path}: {message}")]
    Patch { path: PathBuf, message: String },

    #[error("Could not copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Worker task failed: {0}")]
    TaskJoin(String),
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml {
            error,
            context: "pkgsync.toml".to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Error::TaskJoin(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
