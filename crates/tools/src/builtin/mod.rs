//! Built-in tools: file I/O, shell, git, and hosting-platform access.

mod bash;
mod file;
mod git;
mod github;

pub use bash::BashTool;
pub use file::{ListFilesTool, ReadFileTool, WriteFileTool};
pub use git::{
    GitAddTool, GitBranchTool, GitCommitTool, GitDiffTool, GitLogTool, GitStatusTool,
};
pub use github::{CreateCommentTool, GetIssueTool, ListIssuesTool};

use std::sync::Arc;

use fh_domain::Result;

use crate::ToolRegistry;

/// Register every built-in tool.
pub fn register_all(registry: &ToolRegistry) -> Result<()> {
    registry.register(Arc::new(ReadFileTool))?;
    registry.register(Arc::new(WriteFileTool))?;
    registry.register(Arc::new(ListFilesTool))?;
    registry.register(Arc::new(BashTool))?;
    registry.register(Arc::new(GitStatusTool))?;
    registry.register(Arc::new(GitDiffTool))?;
    registry.register(Arc::new(GitLogTool))?;
    registry.register(Arc::new(GitAddTool))?;
    registry.register(Arc::new(GitCommitTool))?;
    registry.register(Arc::new(GitBranchTool))?;
    registry.register(Arc::new(GetIssueTool))?;
    registry.register(Arc::new(CreateCommentTool))?;
    registry.register(Arc::new(ListIssuesTool))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtins_register_once() {
        let registry = ToolRegistry::new();
        register_all(&registry).unwrap();
        assert_eq!(registry.len(), 13);
        for name in [
            "read_file",
            "write_file",
            "list_files",
            "bash",
            "git_status",
            "git_diff",
            "git_log",
            "git_add",
            "git_commit",
            "git_branch",
            "github_get_issue",
            "github_create_comment",
            "github_list_issues",
        ] {
            assert!(registry.get(name).is_some(), "missing builtin {name}");
        }
    }
}
