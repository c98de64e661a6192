//! Parsed webhook events.
//!
//! The receiver turns one HTTP delivery into an [`Event`]; it is immutable
//! from then on. Only the three event kinds the engine handles are accepted.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "issues")]
    Issues,
    #[serde(rename = "issue_comment")]
    IssueComment,
    #[serde(rename = "pull_request_review_comment")]
    PrReviewComment,
}

impl EventKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "issues" => Some(Self::Issues),
            "issue_comment" => Some(Self::IssueComment),
            "pull_request_review_comment" => Some(Self::PrReviewComment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::IssueComment => "issue_comment",
            Self::PrReviewComment => "pull_request_review_comment",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub full_name: String,
    pub clone_url: String,
    #[serde(default)]
    pub default_branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrRef {
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub head_ref: String,
    #[serde(default)]
    pub base_ref: String,
}

/// One parsed delivery. Exactly one of `issue` / `pull_request` is populated
/// for issue vs PR events; `issue_comment` deliveries populate `issue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub action: String,
    #[serde(default)]
    pub delivery_id: String,
    pub repository: RepoRef,
    #[serde(default)]
    pub issue: Option<IssueRef>,
    #[serde(default)]
    pub pull_request: Option<PrRef>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub comment_body: String,
    #[serde(default)]
    pub sender: String,
}

impl Event {
    /// One-line summary for job logging.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("delivery={}", self.delivery_id),
            format!("event={}", self.kind.as_str()),
            format!("action={}", self.action),
            format!("repo={}", self.repository.full_name),
        ];
        if let Some(issue) = &self.issue {
            parts.push(format!("issue={}", issue.number));
        }
        if let Some(pr) = &self.pull_request {
            parts.push(format!("pr={}", pr.number));
        }
        if !self.label.is_empty() {
            parts.push(format!("label={}", self.label));
        }
        if !self.sender.is_empty() {
            parts.push(format!("sender={}", self.sender));
        }
        parts.join(" ")
    }
}

// ── raw payload shapes (hosting-platform wire format) ──────────────

#[derive(Deserialize, Default)]
struct RawName {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Default)]
struct RawRef {
    #[serde(default)]
    r#ref: String,
}

#[derive(Deserialize, Default)]
struct RawIssue {
    #[serde(default)]
    number: u64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    labels: Vec<RawName>,
}

#[derive(Deserialize, Default)]
struct RawPullRequest {
    #[serde(default)]
    number: u64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    head: RawRef,
    #[serde(default)]
    base: RawRef,
}

#[derive(Deserialize, Default)]
struct RawComment {
    #[serde(default)]
    body: String,
}

#[derive(Deserialize, Default)]
struct RawRepository {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    clone_url: String,
    #[serde(default)]
    default_branch: String,
}

#[derive(Deserialize, Default)]
struct RawSender {
    #[serde(default)]
    login: String,
}

#[derive(Deserialize, Default)]
struct RawPayload {
    #[serde(default)]
    action: String,
    #[serde(default)]
    label: RawName,
    #[serde(default)]
    issue: Option<RawIssue>,
    #[serde(default)]
    pull_request: Option<RawPullRequest>,
    #[serde(default)]
    comment: RawComment,
    #[serde(default)]
    repository: RawRepository,
    #[serde(default)]
    sender: RawSender,
}

/// Parse one delivery from its event-kind header value, delivery id header
/// value, and JSON body.
pub fn parse_event(kind: &str, delivery_id: &str, payload: &[u8]) -> Result<Event> {
    let kind = EventKind::parse(kind)
        .ok_or_else(|| Error::Other(format!("unsupported event type: {kind}")))?;
    let raw: RawPayload = serde_json::from_slice(payload)?;

    let issue = raw.issue.filter(|i| i.number != 0).map(|i| IssueRef {
        number: i.number,
        state: i.state,
        title: i.title,
        body: i.body,
        labels: i.labels.into_iter().map(|l| l.name).collect(),
    });
    let pull_request = raw
        .pull_request
        .filter(|pr| pr.number != 0)
        .map(|pr| PrRef {
            number: pr.number,
            state: pr.state,
            title: pr.title,
            body: pr.body,
            head_ref: pr.head.r#ref,
            base_ref: pr.base.r#ref,
        });

    Ok(Event {
        kind,
        action: raw.action,
        delivery_id: delivery_id.to_string(),
        repository: RepoRef {
            full_name: raw.repository.full_name,
            clone_url: raw.repository.clone_url,
            default_branch: raw.repository.default_branch,
        },
        issue,
        pull_request,
        label: raw.label.name,
        comment_body: raw.comment.body,
        sender: raw.sender.login,
    })
}
