use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workspace
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-job workspaces are created under `base` as
/// `<prefix>-<YYYYMMDD-HHMMSS>/` with `repo/` and `outputs/` children.
/// They are not removed automatically; cleanup is a deployment concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "d_base")]
    pub base: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self { base: d_base() }
    }
}

fn d_base() -> PathBuf {
    PathBuf::from("./workdir")
}
