use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_8080")]
    pub port: u16,
    /// Path of the single webhook endpoint.
    #[serde(default = "d_webhook_path")]
    pub webhook_path: String,
    /// IPs or CIDRs allowed to deliver webhooks. Empty ⇒ allow all.
    #[serde(default)]
    pub ip_allowlist: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: 8080,
            webhook_path: d_webhook_path(),
            ip_allowlist: Vec::new(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_8080() -> u16 {
    8080
}
fn d_webhook_path() -> String {
    "/webhook".into()
}
