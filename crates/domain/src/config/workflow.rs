use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workflow
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Number of concurrent job workers. The job queue holds `workers * 4`
    /// entries; enqueueing beyond that fails the delivery with 503.
    #[serde(default = "d_2")]
    pub workers: usize,
    /// Labels whose addition to an open issue starts a workflow.
    #[serde(default = "d_trigger_labels")]
    pub trigger_labels: Vec<String>,
    #[serde(default = "d_in_progress")]
    pub in_progress_label: String,
    #[serde(default = "d_needs_info")]
    pub needs_info_label: String,
    #[serde(default = "d_done")]
    pub done_label: String,
    /// Slash commands recognized in PR review comments.
    #[serde(default = "d_slash_commands")]
    pub pr_slash_commands: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            trigger_labels: d_trigger_labels(),
            in_progress_label: d_in_progress(),
            needs_info_label: d_needs_info(),
            done_label: d_done(),
            pr_slash_commands: d_slash_commands(),
        }
    }
}

impl WorkflowConfig {
    /// Every status label the engine manages, used when computing the
    /// replace-set for a label transition.
    pub fn status_labels(&self) -> Vec<String> {
        let mut labels = vec![
            self.in_progress_label.clone(),
            self.needs_info_label.clone(),
            self.done_label.clone(),
        ];
        labels.extend(self.trigger_labels.iter().cloned());
        labels
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_2() -> usize {
    2
}
fn d_trigger_labels() -> Vec<String> {
    vec!["ai-ready".into()]
}
fn d_in_progress() -> String {
    "ai-in-progress".into()
}
fn d_needs_info() -> String {
    "ai-needs-info".into()
}
fn d_done() -> String {
    "ai-done".into()
}
fn d_slash_commands() -> Vec<String> {
    vec!["/ai-optimize".into()]
}
