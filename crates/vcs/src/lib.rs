//! Git client used by the workflow engine and the git tools.
//!
//! Everything shells out to the `git` binary via `tokio::process`; there is
//! no embedded git. `commit_all` and `has_changes` exclude automation
//! artifacts by basename so a run can never commit its own outputs.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use fh_domain::{Error, Result};

pub mod urlauth;

pub use urlauth::{inject_token, redact_token};

/// Automation artifacts that must never be committed, matched by basename
/// regardless of directory. With the workspace layout these live under
/// `outputs/` (outside the repo), so this is a second line of defense.
pub const EXCLUDED_ARTIFACTS: &[&str] = &[
    "context.json",
    "repo_instructions.md",
    "prompt.md",
    "llm_response.json",
    "llm_output.json",
    "run.log",
];

fn is_excluded(path: &str) -> bool {
    let base = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    EXCLUDED_ARTIFACTS.contains(&base)
}

/// Parse `git status --porcelain` output into changed paths, excluding
/// automation artifacts. Renames report the new name.
pub fn changed_paths(porcelain: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in porcelain.lines() {
        if line.len() < 4 {
            continue;
        }
        let mut name = line[3..].trim().to_string();
        if let Some(idx) = name.find(" -> ") {
            name = name[idx + 4..].to_string();
        }
        // Porcelain quotes names with special characters.
        let name = name.trim_matches('"').to_string();
        if !is_excluded(&name) {
            out.push(name);
        }
    }
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Vcs trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Version-control operations the workflow engine depends on. Injected so
/// engine tests can run against an in-memory fake.
#[async_trait]
pub trait Vcs: Send + Sync {
    async fn clone_repo(&self, repo_url: &str, dir: &Path) -> Result<()>;
    /// `git checkout -B <branch> [<base>]`.
    async fn checkout_branch(&self, dir: &Path, branch: &str, base: &str) -> Result<()>;
    /// Stage and commit every non-artifact change. No-op when clean.
    async fn commit_all(&self, dir: &Path, message: &str) -> Result<()>;
    async fn push(&self, dir: &Path, branch: &str) -> Result<()>;
    /// Rewrite the origin URL so pushes authenticate with `token`.
    async fn set_remote_auth(&self, dir: &Path, token: &str) -> Result<()>;
    /// Apply a unified diff (`git apply --whitespace=nowarn`, patch on stdin).
    async fn apply_patch(&self, dir: &Path, patch: &str) -> Result<()>;
    /// True when the working tree has non-artifact changes.
    async fn has_changes(&self, dir: &Path) -> Result<bool>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GitClient
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default)]
pub struct GitClient {
    /// Override for the git binary, mostly for tests.
    pub git_binary: Option<PathBuf>,
}

impl GitClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn binary(&self) -> &Path {
        self.git_binary
            .as_deref()
            .unwrap_or_else(|| Path::new("git"))
    }

    async fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(self.binary());
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        let output = cmd.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or(""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    // ── tool-facing helpers (git_* builtin tools) ──────────────────

    pub async fn status_porcelain(&self, dir: &Path) -> Result<String> {
        self.run(Some(dir), &["status", "--porcelain"]).await
    }

    pub async fn diff(&self, dir: &Path, staged: bool, path: Option<&str>) -> Result<String> {
        let mut args = vec!["diff"];
        if staged {
            args.push("--cached");
        }
        if let Some(path) = path {
            args.push("--");
            args.push(path);
        }
        self.run(Some(dir), &args).await
    }

    pub async fn log(&self, dir: &Path, count: u32, oneline: bool) -> Result<String> {
        let count_arg = format!("-{count}");
        let mut args = vec!["log", count_arg.as_str()];
        if oneline {
            args.push("--oneline");
        }
        self.run(Some(dir), &args).await
    }

    pub async fn add(&self, dir: &Path, paths: &[String]) -> Result<()> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run(Some(dir), &args).await.map(|_| ())
    }

    pub async fn commit(&self, dir: &Path, message: &str) -> Result<()> {
        self.run(Some(dir), &["commit", "-m", message])
            .await
            .map(|_| ())
    }

    pub async fn branch_list(&self, dir: &Path) -> Result<String> {
        self.run(Some(dir), &["branch", "--list"]).await
    }

    pub async fn branch_create(&self, dir: &Path, name: &str) -> Result<()> {
        self.run(Some(dir), &["branch", name]).await.map(|_| ())
    }

    pub async fn branch_switch(&self, dir: &Path, name: &str) -> Result<()> {
        self.run(Some(dir), &["checkout", name]).await.map(|_| ())
    }
}

#[async_trait]
impl Vcs for GitClient {
    async fn clone_repo(&self, repo_url: &str, dir: &Path) -> Result<()> {
        let dir_str = dir.to_string_lossy();
        self.run(None, &["clone", repo_url, dir_str.as_ref()])
            .await
            .map(|_| ())
    }

    async fn checkout_branch(&self, dir: &Path, branch: &str, base: &str) -> Result<()> {
        if base.is_empty() {
            self.run(Some(dir), &["checkout", "-B", branch]).await?;
        } else {
            self.run(Some(dir), &["checkout", "-B", branch, base])
                .await?;
        }
        Ok(())
    }

    async fn commit_all(&self, dir: &Path, message: &str) -> Result<()> {
        let porcelain = self.status_porcelain(dir).await?;
        let paths = changed_paths(&porcelain);
        if paths.is_empty() {
            tracing::debug!(dir = %dir.display(), "commit_all: nothing to stage");
            return Ok(());
        }
        self.add(dir, &paths).await?;
        self.commit(dir, message).await
    }

    async fn push(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(Some(dir), &["push", "origin", branch])
            .await
            .map(|_| ())
    }

    async fn set_remote_auth(&self, dir: &Path, token: &str) -> Result<()> {
        if token.is_empty() {
            return Ok(());
        }
        let current = self
            .run(Some(dir), &["remote", "get-url", "origin"])
            .await?;
        let updated = inject_token(current.trim(), token)?;
        self.run(Some(dir), &["remote", "set-url", "origin", &updated])
            .await
            .map(|_| ())
    }

    async fn apply_patch(&self, dir: &Path, patch: &str) -> Result<()> {
        if patch.trim().is_empty() {
            return Ok(());
        }
        let mut cmd = Command::new(self.binary());
        cmd.args(["apply", "--whitespace=nowarn"])
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            use tokio::io::AsyncWriteExt;
            stdin.write_all(patch.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!("git apply failed: {}", stderr.trim())));
        }
        Ok(())
    }

    async fn has_changes(&self, dir: &Path) -> Result<bool> {
        let porcelain = self.status_porcelain(dir).await?;
        Ok(!changed_paths(&porcelain).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_paths_parses_porcelain() {
        let porcelain = " M src/main.rs\n?? new_file.txt\nA  staged.rs\n";
        let paths = changed_paths(porcelain);
        assert_eq!(paths, vec!["src/main.rs", "new_file.txt", "staged.rs"]);
    }

    #[test]
    fn changed_paths_excludes_artifacts_by_basename() {
        let porcelain = " M README.md\n M outputs/llm_output.json\n?? prompt.md\n M deep/dir/run.log\n";
        let paths = changed_paths(porcelain);
        assert_eq!(paths, vec!["README.md"]);
    }

    #[test]
    fn changed_paths_handles_renames() {
        let porcelain = "R  old_name.rs -> new_name.rs\n";
        assert_eq!(changed_paths(porcelain), vec!["new_name.rs"]);
    }

    #[test]
    fn changed_paths_empty_tree() {
        assert!(changed_paths("").is_empty());
    }

    #[test]
    fn artifact_only_changes_count_as_clean() {
        let porcelain = " M outputs/llm_output.json\n M context.json\n";
        assert!(changed_paths(porcelain).is_empty());
    }
}
