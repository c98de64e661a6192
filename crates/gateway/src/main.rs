use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fh_agent::ApiAgentRunner;
use fh_domain::config::Config;
use fh_gateway::allowlist::IpAllowlist;
use fh_gateway::api;
use fh_gateway::queue;
use fh_gateway::runtime::Engine;
use fh_gateway::state::AppState;
use fh_githost::GitHubClient;
use fh_tools::ToolRegistry;
use fh_vcs::GitClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ──────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fh_gateway=debug")),
        )
        .json()
        .init();

    tracing::info!("Forgehand starting");

    // ── Config ───────────────────────────────────────────────────────
    let config_path =
        std::env::var("FORGEHAND_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let mut config: Config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {config_path}"))?;
        Config::from_toml(&raw).with_context(|| format!("parsing {config_path}"))?
    } else {
        tracing::warn!(path = %config_path, "config file not found, using defaults");
        Config::default()
    };
    config.resolve().context("resolving configuration")?;
    let config = Arc::new(config);

    let allowlist = Arc::new(
        IpAllowlist::parse(&config.server.ip_allowlist).context("parsing IP allowlist")?,
    );

    // ── Clients ──────────────────────────────────────────────────────
    let host = Arc::new(
        GitHubClient::new(&config.github.api_base_url, &config.github.token)
            .context("creating GitHub client")?,
    );
    let vcs = Arc::new(GitClient::new());
    let provider = fh_providers::from_config(&config.llm).context("creating LLM provider")?;
    tracing::info!(provider = provider.name(), model = %config.llm.model, "LLM provider ready");

    // ── Tool registry ────────────────────────────────────────────────
    let registry = Arc::new(ToolRegistry::new());
    if config.agent.tools_enabled {
        fh_tools::builtin::register_all(&registry).context("registering built-in tools")?;
        tracing::info!(tools = ?registry.names(), "built-in tools registered");
    } else {
        tracing::warn!("built-in tools disabled");
    }
    tokio::fs::create_dir_all(&config.workspace.base)
        .await
        .context("creating workspace base")?;
    let mcp_servers = fh_tools::mcp::register_servers(
        &registry,
        &config.mcp_servers,
        &config.workspace.base,
    )
    .await;
    if !mcp_servers.is_empty() {
        tracing::info!(
            servers = mcp_servers.len(),
            tools = registry.len(),
            "external tool servers registered"
        );
    }

    // ── Engine + workers ─────────────────────────────────────────────
    let runner = Arc::new(ApiAgentRunner::new(
        provider,
        Arc::clone(&registry),
        config.agent.clone(),
        &config.github.token,
    ));
    let engine = Arc::new(Engine::new(
        config.workflow.clone(),
        config.workspace.clone(),
        &config.github.token,
        host,
        vcs,
        Arc::clone(&runner) as Arc<dyn fh_agent::WorkflowAgent>,
    ));

    let cancel = CancellationToken::new();
    let (jobs_tx, jobs_rx) = queue::channel(config.workflow.workers);
    let workers = queue::spawn_workers(
        config.workflow.workers,
        jobs_rx,
        engine,
        cancel.clone(),
    );
    tracing::info!(workers = config.workflow.workers, "worker pool started");

    // ── HTTP surface ─────────────────────────────────────────────────
    let state = AppState {
        config: Arc::clone(&config),
        allowlist,
        jobs: jobs_tx,
        chat: runner,
        cancel: cancel.clone(),
    };
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, webhook_path = %config.server.webhook_path, "Forgehand listening");

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("shutdown signal received");
            cancel.cancel();
        }
    };
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("axum server error")?;

    // Drain in-flight jobs, then close the tool servers.
    cancel.cancel();
    for worker in workers {
        let _ = worker.await;
    }
    for server in &mcp_servers {
        server.shutdown().await;
    }
    tracing::info!("Forgehand stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
