//! Stdio transport: spawn the server process, send one JSON object per
//! line on stdin, and dispatch response lines from a dedicated reader task
//! into a pending-request table keyed by request id.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{oneshot, Mutex};

use fh_domain::config::McpServerConfig;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tool server process has exited")]
    ProcessExited,

    #[error("timeout waiting for response")]
    Timeout,
}

type PendingTable = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: PendingTable,
    next_id: AtomicU64,
    alive: Arc<AtomicBool>,
}

impl StdioTransport {
    /// Spawn the configured command. The child inherits nothing from the
    /// parent environment unless listed in the config; cwd is `work_dir`.
    pub fn spawn(config: &McpServerConfig, work_dir: &std::path::Path) -> Result<Self, TransportError> {
        let mut cmd = tokio::process::Command::new(&config.command);
        cmd.args(&config.args)
            .env_clear()
            .envs(&config.env)
            .current_dir(work_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to capture child stdin",
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to capture child stdout",
            ))
        })?;

        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        // Reader task: one JSON object per line, dispatched by id. Lines
        // without an id are server notifications and are skipped.
        {
            let pending = Arc::clone(&pending);
            let alive = Arc::clone(&alive);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            let trimmed = line.trim();
                            if trimmed.is_empty() || !trimmed.starts_with('{') {
                                continue;
                            }
                            let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(trimmed) else {
                                tracing::debug!(line = %trimmed, "skipping unparseable line from tool server");
                                continue;
                            };
                            let Some(id) = resp.id else {
                                continue;
                            };
                            let sender = pending.lock().await.remove(&id);
                            if let Some(sender) = sender {
                                let _ = sender.send(resp);
                            } else {
                                tracing::debug!(id, "response for unknown request id");
                            }
                        }
                        Ok(None) | Err(_) => break,
                    }
                }
                alive.store(false, Ordering::SeqCst);
                // Wake any waiters: dropping the senders errors their receivers.
                pending.lock().await.clear();
            });
        }

        Ok(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            next_id: AtomicU64::new(1),
            alive,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn write_line(&self, json: &str) -> Result<(), TransportError> {
        if !self.is_alive() {
            return Err(TransportError::ProcessExited);
        }
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(json.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Send a request and wait for the matching response. Callers bound the
    /// wait by wrapping this future in a timeout or select; dropping it
    /// abandons the pending slot harmlessly.
    pub async fn send(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, method, params);
        let json = serde_json::to_string(&req)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        tracing::debug!(id, method, "sending tool server request");
        if let Err(e) = self.write_line(&json).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        rx.await.map_err(|_| TransportError::ProcessExited)
    }

    /// Send a notification; no pending entry is created.
    pub async fn notify(&self, method: &str) -> Result<(), TransportError> {
        let notif = JsonRpcNotification::new(method);
        let json = serde_json::to_string(&notif)?;
        tracing::debug!(method, "sending tool server notification");
        self.write_line(&json).await
    }

    /// Shut the pipes and terminate the child.
    pub async fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.shutdown().await;
        }
        let mut child = self.child.lock().await;
        let wait = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait()).await;
        match wait {
            Ok(Ok(status)) => {
                tracing::debug!(?status, "tool server exited");
            }
            _ => {
                tracing::warn!("tool server did not exit in time, killing");
                let _ = child.kill().await;
            }
        }
    }
}
