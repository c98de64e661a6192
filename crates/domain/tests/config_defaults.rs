use fh_domain::config::{Config, ProviderKind};

#[test]
fn empty_config_parses_with_defaults() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.webhook_path, "/webhook");
    assert!(config.server.ip_allowlist.is_empty());
    assert_eq!(config.workflow.workers, 2);
    assert_eq!(config.workflow.trigger_labels, vec!["ai-ready"]);
    assert_eq!(config.workflow.in_progress_label, "ai-in-progress");
    assert_eq!(config.workflow.needs_info_label, "ai-needs-info");
    assert_eq!(config.workflow.done_label, "ai-done");
    assert_eq!(config.workflow.pr_slash_commands, vec!["/ai-optimize"]);
    assert_eq!(config.agent.max_iterations, 50);
    assert_eq!(config.agent.max_messages, 50);
    assert!(config.agent.compaction.enabled);
    assert_eq!(config.agent.compaction.threshold, 30);
    assert_eq!(config.agent.compaction.keep_recent, 10);
    assert!(config.mcp_servers.is_empty());
}

#[test]
fn explicit_sections_override_defaults() {
    let raw = r#"
[server]
host = "127.0.0.1"
port = 9999
webhook_path = "/hooks/gh"
ip_allowlist = ["140.82.112.0/20", "10.0.0.1"]

[workflow]
workers = 4
trigger_labels = ["automate", "ai-ready"]

[llm]
provider = "openai"
base_url = "https://api.openai.example"
model = "gpt-4o"
"#;
    let config = Config::from_toml(raw).unwrap();
    assert_eq!(config.server.port, 9999);
    assert_eq!(config.server.ip_allowlist.len(), 2);
    assert_eq!(config.workflow.workers, 4);
    assert_eq!(config.workflow.trigger_labels.len(), 2);
    assert_eq!(config.llm.provider, ProviderKind::Openai);
}

#[test]
fn mcp_servers_parse_as_array_of_tables() {
    let raw = r#"
[[mcp_servers]]
name = "search"
command = "search-server"
args = ["--stdio"]

[mcp_servers.env]
SEARCH_TOKEN = "t"
"#;
    let config = Config::from_toml(raw).unwrap();
    assert_eq!(config.mcp_servers.len(), 1);
    let server = &config.mcp_servers[0];
    assert_eq!(server.name, "search");
    assert_eq!(server.args, vec!["--stdio"]);
    assert_eq!(server.env.get("SEARCH_TOKEN").map(String::as_str), Some("t"));
}

#[test]
fn status_labels_include_triggers() {
    let config = Config::from_toml("").unwrap();
    let labels = config.workflow.status_labels();
    assert!(labels.contains(&"ai-in-progress".to_string()));
    assert!(labels.contains(&"ai-needs-info".to_string()));
    assert!(labels.contains(&"ai-done".to_string()));
    assert!(labels.contains(&"ai-ready".to_string()));
}

#[test]
fn resolve_requires_llm_settings() {
    let mut config = Config::from_toml("").unwrap();
    // No base_url/model configured: resolve must fail before serving.
    config.github.token_env = "FH_TEST_GH_TOKEN_SET".into();
    std::env::set_var("FH_TEST_GH_TOKEN_SET", "tok");
    let err = config.resolve().unwrap_err();
    assert!(err.to_string().contains("llm.base_url"));
    std::env::remove_var("FH_TEST_GH_TOKEN_SET");
}

#[test]
fn resolve_requires_github_token_env() {
    let mut config = Config::from_toml("").unwrap();
    config.github.token_env = "FH_TEST_GH_TOKEN_UNSET".into();
    let err = config.resolve().unwrap_err();
    assert!(err.to_string().contains("FH_TEST_GH_TOKEN_UNSET"));
}

#[test]
fn resolve_clamps_worker_count() {
    let mut config = Config::from_toml("[workflow]\nworkers = 0\n").unwrap();
    config.github.token_env = "FH_TEST_GH_TOKEN_W".into();
    config.llm.api_key_env = "FH_TEST_LLM_KEY_W".into();
    config.llm.base_url = "https://api.anthropic.com".into();
    config.llm.model = "claude-sonnet-4-20250514".into();
    std::env::set_var("FH_TEST_GH_TOKEN_W", "tok");
    std::env::set_var("FH_TEST_LLM_KEY_W", "key");
    config.resolve().unwrap();
    assert_eq!(config.workflow.workers, 1);
    std::env::remove_var("FH_TEST_GH_TOKEN_W");
    std::env::remove_var("FH_TEST_LLM_KEY_W");
}
