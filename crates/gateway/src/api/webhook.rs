//! The single webhook endpoint.
//!
//! The reply is about *acceptance only*: 202 means the event was queued,
//! never that the job succeeded. Processing happens on the worker pool.

use std::net::{IpAddr, SocketAddr};

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use fh_domain::event::parse_event;

use crate::queue::Job;
use crate::state::AppState;

/// Prefer the first parseable entry of `x-forwarded-for`, else the peer.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }
    peer.ip()
}

pub async fn receive(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ip = client_ip(&headers, peer);
    if !state.allowlist.allows(ip) {
        tracing::warn!(client_ip = %ip, "webhook rejected: IP not in allowlist");
        return StatusCode::FORBIDDEN.into_response();
    }

    let Some(kind) = headers.get("x-github-event").and_then(|v| v.to_str().ok()) else {
        tracing::warn!(client_ip = %ip, "webhook rejected: missing event header");
        return (StatusCode::BAD_REQUEST, "missing x-github-event header").into_response();
    };
    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let event = match parse_event(kind, delivery_id, &body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(client_ip = %ip, error = %e, "webhook rejected: invalid payload");
            return (StatusCode::BAD_REQUEST, "invalid webhook payload").into_response();
        }
    };

    let summary = event.summary();
    if state.jobs.try_send(Job { event }).is_err() {
        tracing::error!(%summary, "webhook rejected: queue full");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    tracing::info!(%summary, client_ip = %ip, "webhook accepted");
    StatusCode::ACCEPTED.into_response()
}
