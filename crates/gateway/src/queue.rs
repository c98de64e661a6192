//! Bounded in-memory job queue and the worker pool draining it.
//!
//! Capacity is `workers * 4`; enqueueing past that fails immediately so the
//! receiver can answer 503. Each worker runs one job at a time through the
//! engine; shutdown cancels the shared token and waits for in-flight jobs.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fh_domain::event::Event;

use crate::runtime::Engine;

/// One queued unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    pub event: Event,
}

pub fn channel(workers: usize) -> (mpsc::Sender<Job>, mpsc::Receiver<Job>) {
    mpsc::channel(workers.max(1) * 4)
}

/// Launch the worker pool. Returns the join handles so shutdown can await
/// in-flight jobs.
pub fn spawn_workers(
    workers: usize,
    rx: mpsc::Receiver<Job>,
    engine: Arc<Engine>,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..workers.max(1))
        .map(|worker_id| {
            let rx = Arc::clone(&rx);
            let engine = Arc::clone(&engine);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    let job = tokio::select! {
                        _ = cancel.cancelled() => break,
                        job = async { rx.lock().await.recv().await } => job,
                    };
                    let Some(job) = job else { break };
                    let summary = job.event.summary();
                    tracing::info!(worker_id, %summary, "job start");
                    match engine.handle_event(&cancel, &job.event).await {
                        Ok(()) => tracing::info!(worker_id, %summary, "job done"),
                        Err(e) => {
                            // Verbose form: full cause chain with step metadata.
                            tracing::error!(worker_id, %summary, error = %e.chain(), "job failed");
                        }
                    }
                }
                tracing::debug!(worker_id, "worker stopped");
            })
        })
        .collect()
}
