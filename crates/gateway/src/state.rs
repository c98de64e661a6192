//! Shared application state for the HTTP surface.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use fh_agent::ApiAgentRunner;
use fh_domain::config::Config;

use crate::allowlist::IpAllowlist;
use crate::queue::Job;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub allowlist: Arc<IpAllowlist>,
    pub jobs: mpsc::Sender<Job>,
    pub chat: Arc<ApiAgentRunner>,
    pub cancel: CancellationToken,
}
