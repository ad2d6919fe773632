pub mod lerna;
pub mod npm;

use std::path::PathBuf;

pub use lerna::LernaAdapter;
pub use npm::NpmWorkspacesAdapter;

use pkgsync_core::adapter::WorkspaceAdapter;

/// Every supported workspace format, npm workspaces first.
pub fn default_adapters(lerna_path: Option<PathBuf>) -> Vec<Box<dyn WorkspaceAdapter>> {
    vec![
        Box::new(NpmWorkspacesAdapter),
        Box::new(LernaAdapter::new(lerna_path)),
    ]
}
