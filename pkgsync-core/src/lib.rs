//! Core library for synchronizing package manifests and shared files across a monorepo.

pub mod adapter;
pub mod change;
pub mod config;
pub mod copy;
pub mod error;
pub mod fields;
pub mod glob;
pub mod locator;
pub mod manifest;
pub mod patch;
pub mod path_utils;
pub mod summary;

pub use adapter::{WorkspaceAdapter, WorkspaceGlobs};
pub use change::{ChangeEngine, ChangeRecord, FailurePolicy, FieldChange, RecordStream};
pub use config::SyncConfig;
pub use copy::{CopyOptions, CopyOutcome, CopyResult, FileSync};
pub use error::{Error, Result};
pub use fields::FieldSet;
pub use locator::{LocatedPackages, ProjectLocator};
pub use manifest::{Manifest, MANIFEST_FILE};
pub use summary::{summarize_changes, summarize_copies, ChangeTally, CopyTally, Summary};
