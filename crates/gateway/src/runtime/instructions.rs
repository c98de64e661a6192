//! Repo-local agent instructions.
//!
//! Directories are visited root to leaf; the first of `AGENT.md`,
//! `AGENTS.md`, `CLAUDE.md` found in each directory is concatenated, so
//! more specific directories refine broader ones. Repos without any fall
//! back to `README.md`.

use std::path::{Path, PathBuf};

const CANDIDATE_FILES: &[&str] = &["AGENT.md", "AGENTS.md", "CLAUDE.md"];
const NO_INSTRUCTIONS: &str = "No repository instructions found.";
const MAX_INSTRUCTION_BYTES: usize = 65536;

/// Breadth-first directory walk, sorted within each level for determinism.
/// Hidden directories (`.git` and friends) are skipped.
fn walk_dirs(root: &Path) -> Vec<PathBuf> {
    let mut out = vec![root.to_path_buf()];
    let mut frontier = vec![root.to_path_buf()];
    while let Some(dir) = frontier.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut children: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| !n.starts_with('.'))
                    .unwrap_or(false)
            })
            .collect();
        children.sort();
        out.extend(children.iter().cloned());
        // Depth-first in reverse keeps overall root-to-leaf ordering stable.
        frontier.extend(children.into_iter().rev());
    }
    out
}

/// Load the layered instruction text for a repository checkout.
pub fn build_repo_instructions(repo_dir: &Path) -> String {
    let mut sections: Vec<String> = Vec::new();
    let mut total = 0usize;

    'dirs: for dir in walk_dirs(repo_dir) {
        for candidate in CANDIDATE_FILES {
            let path = dir.join(candidate);
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            total += content.len();
            sections.push(content.to_string());
            if total >= MAX_INSTRUCTION_BYTES {
                break 'dirs;
            }
            break; // first candidate per directory wins
        }
    }

    if !sections.is_empty() {
        return sections.join("\n\n");
    }

    // Fallback for repos that rely on README-only guidance.
    if let Ok(readme) = std::fs::read_to_string(repo_dir.join("README.md")) {
        let readme = readme.trim();
        if !readme.is_empty() {
            return format!("## README.md\n{readme}");
        }
    }
    NO_INSTRUCTIONS.to_string()
}
