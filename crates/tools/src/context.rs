//! Per-job execution context for tools.
//!
//! Carries the workspace root every filesystem path must stay inside, the
//! permission bits each built-in asserts before running, and the hosting
//! credentials the platform tools use.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::ToolOutput;

pub const DEFAULT_BASH_TIMEOUT_SECS: u64 = 60;
pub const MAX_BASH_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Copy)]
pub struct Permissions {
    pub bash: bool,
    pub file_read: bool,
    pub file_write: bool,
    pub vcs: bool,
    pub githost: bool,
    pub network: bool,
}

impl Permissions {
    /// Everything allowed — the default for workflow runs.
    pub fn all() -> Self {
        Self {
            bash: true,
            file_read: true,
            file_write: true,
            vcs: true,
            githost: true,
            network: true,
        }
    }

    /// Read-only file access, nothing else.
    pub fn read_only() -> Self {
        Self {
            bash: false,
            file_read: true,
            file_write: false,
            vcs: false,
            githost: false,
            network: false,
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone)]
pub struct ToolContext {
    pub work_dir: PathBuf,
    pub permissions: Permissions,
    pub github_token: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub env: HashMap<String, String>,
    pub bash_timeout_secs: u64,
}

impl ToolContext {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            permissions: Permissions::all(),
            github_token: String::new(),
            repo_owner: String::new(),
            repo_name: String::new(),
            env: HashMap::new(),
            bash_timeout_secs: DEFAULT_BASH_TIMEOUT_SECS,
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_github(
        mut self,
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        self.github_token = token.into();
        self.repo_owner = owner.into();
        self.repo_name = repo.into();
        self
    }

    pub fn with_bash_timeout(mut self, seconds: u64) -> Self {
        self.bash_timeout_secs = seconds.clamp(1, MAX_BASH_TIMEOUT_SECS);
        self
    }

    /// Resolve a caller-supplied path (absolute or workspace-relative) to an
    /// absolute path inside the workspace. Escaping the workspace via `..`
    /// is an error, not a clamp.
    pub fn validate_path(&self, path: &str) -> Result<PathBuf, ToolOutput> {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            normalize(candidate)
        } else {
            normalize(&self.work_dir.join(candidate))
        };
        let root = normalize(&self.work_dir);
        if joined.starts_with(&root) {
            Ok(joined)
        } else {
            Err(ToolOutput::error("path outside work dir"))
        }
    }
}

/// Lexically normalize a path: resolve `.` and `..` components without
/// touching the filesystem, so paths that don't exist yet still validate.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    // Leading `..` walks above the root; keep it so the
                    // starts_with check fails.
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
