//! Per-job workspace layout and artifact persistence.
//!
//! `<base>/<prefix>-<YYYYMMDD-HHMMSS>/` with `repo/` (working tree) and
//! `outputs/` (automation artifacts). The workspace is never removed here;
//! cleanup is a deployment concern.

use std::path::{Path, PathBuf};

use fh_agent::RunArtifacts;
use fh_domain::event::RepoRef;
use fh_domain::{Error, Result};
use fh_vcs::{inject_token, redact_token, Vcs};

pub const REPO_SUBDIR: &str = "repo";
pub const OUTPUTS_SUBDIR: &str = "outputs";

#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    pub fn repo_dir(&self) -> PathBuf {
        self.root.join(REPO_SUBDIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_SUBDIR)
    }
}

/// Create the workspace directories and clone the repository into `repo/`.
/// The clone URL carries the token in its userinfo for private repos; logs
/// only ever see the redacted form.
pub async fn prepare(
    base: &Path,
    repo: &RepoRef,
    prefix: &str,
    token: &str,
    timestamp: &str,
    vcs: &dyn Vcs,
) -> Result<Workspace> {
    if repo.clone_url.is_empty() {
        return Err(Error::Other("missing clone URL".into()));
    }

    let root = base.join(format!("{prefix}-{timestamp}"));
    let ws = Workspace { root };
    tokio::fs::create_dir_all(ws.outputs_dir()).await?;
    tokio::fs::create_dir_all(ws.repo_dir()).await?;

    let mut clone_url = repo.clone_url.clone();
    if !token.is_empty() {
        if let Ok(updated) = inject_token(&clone_url, token) {
            clone_url = updated;
        }
    }

    tracing::debug!(
        url = %redact_token(&clone_url),
        target = %ws.repo_dir().display(),
        "cloning repository"
    );
    vcs.clone_repo(&clone_url, &ws.repo_dir()).await?;
    Ok(ws)
}

/// Persist run artifacts. Called on every exit path of the run-LLM step, so
/// failures leave `llm_output.json` and `run.log` behind for debugging.
pub async fn write_run_artifacts(
    ws: &Workspace,
    artifacts: &RunArtifacts,
    error: Option<&Error>,
) {
    let outputs = ws.outputs_dir();
    if !artifacts.raw_output.is_empty() {
        let _ = tokio::fs::write(outputs.join("llm_response.json"), &artifacts.raw_output).await;
        let _ = tokio::fs::write(outputs.join("llm_output.json"), &artifacts.raw_output).await;
    }
    let mut log = artifacts.run_log.clone();
    if let Some(error) = error {
        if !log.is_empty() {
            log.push('\n');
        }
        log.push_str(&error.chain());
    }
    if !log.trim().is_empty() {
        let _ = tokio::fs::write(outputs.join("run.log"), log.trim()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopVcs;

    #[async_trait]
    impl Vcs for NoopVcs {
        async fn clone_repo(&self, _url: &str, _dir: &Path) -> Result<()> {
            Ok(())
        }
        async fn checkout_branch(&self, _d: &Path, _b: &str, _base: &str) -> Result<()> {
            Ok(())
        }
        async fn commit_all(&self, _d: &Path, _m: &str) -> Result<()> {
            Ok(())
        }
        async fn push(&self, _d: &Path, _b: &str) -> Result<()> {
            Ok(())
        }
        async fn set_remote_auth(&self, _d: &Path, _t: &str) -> Result<()> {
            Ok(())
        }
        async fn apply_patch(&self, _d: &Path, _p: &str) -> Result<()> {
            Ok(())
        }
        async fn has_changes(&self, _d: &Path) -> Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn prepare_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = RepoRef {
            full_name: "org/repo".into(),
            clone_url: "https://host/org/repo.git".into(),
            default_branch: "main".into(),
        };
        let ws = prepare(tmp.path(), &repo, "issue-12", "tok", "20260101-000000", &NoopVcs)
            .await
            .unwrap();
        assert!(ws.repo_dir().is_dir());
        assert!(ws.outputs_dir().is_dir());
        assert!(ws
            .root
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("issue-12-"));
    }

    #[tokio::test]
    async fn prepare_rejects_missing_clone_url() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = RepoRef::default();
        assert!(
            prepare(tmp.path(), &repo, "issue-1", "", "20260101-000000", &NoopVcs)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn artifacts_are_written_on_failure_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace {
            root: tmp.path().to_path_buf(),
        };
        tokio::fs::create_dir_all(ws.outputs_dir()).await.unwrap();

        let artifacts = RunArtifacts {
            raw_output: "{\"decision\":\"proceed\"}".into(),
            run_log: String::new(),
        };
        write_run_artifacts(&ws, &artifacts, Some(&Error::Agent("max tokens reached".into())))
            .await;

        let raw = std::fs::read_to_string(ws.outputs_dir().join("llm_output.json")).unwrap();
        assert!(raw.contains("proceed"));
        let log = std::fs::read_to_string(ws.outputs_dir().join("run.log")).unwrap();
        assert!(log.contains("max tokens reached"));
    }
}
