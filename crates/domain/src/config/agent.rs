use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on provider round-trips per run.
    #[serde(default = "d_50")]
    pub max_iterations: u32,
    /// Conversation is truncated (pair-preserving) past this many messages.
    #[serde(default = "d_50_usize")]
    pub max_messages: usize,
    /// Default timeout for the bash tool, seconds (clamped to 1..=300 per call).
    #[serde(default = "d_60")]
    pub bash_timeout_secs: u64,
    /// Register the built-in tools.
    #[serde(default = "d_true")]
    pub tools_enabled: bool,
    #[serde(default)]
    pub compaction: CompactionConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            max_messages: 50,
            bash_timeout_secs: 60,
            tools_enabled: true,
            compaction: CompactionConfig::default(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Compaction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compaction replaces a middle slab of the conversation with an LLM-written
/// summary once the history grows past `threshold` messages, keeping the
/// first message and the `keep_recent` most recent ones verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_30")]
    pub threshold: usize,
    #[serde(default = "d_10")]
    pub keep_recent: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 30,
            keep_recent: 10,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_50() -> u32 {
    50
}
fn d_50_usize() -> usize {
    50
}
fn d_60() -> u64 {
    60
}
fn d_30() -> usize {
    30
}
fn d_10() -> usize {
    10
}
