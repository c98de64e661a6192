//! Thin typed accessor for the hosting platform's REST API.
//!
//! The engine talks to [`GitHost`]; [`GitHubClient`] is the real
//! implementation. Only the handful of operations the workflows need are
//! exposed — this is not a general API binding.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use fh_domain::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Data types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default)]
pub struct Issue {
    pub number: u64,
    pub state: String,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub author: String,
}

#[derive(Debug, Clone, Default)]
pub struct Comment {
    pub user: String,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct Repo {
    pub default_branch: String,
    pub clone_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Pr {
    pub number: u64,
    pub state: String,
    pub title: String,
    pub body: String,
    pub head_ref: String,
    pub base_ref: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PrRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GitHost trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait GitHost: Send + Sync {
    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue>;
    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>>;
    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<()>;
    /// Replace the full label set on an issue (replace-set, never delta-add).
    async fn set_issue_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<()>;
    async fn create_pr(&self, owner: &str, repo: &str, req: &PrRequest) -> Result<Pr>;
    async fn update_pr_body(&self, owner: &str, repo: &str, number: u64, body: &str)
        -> Result<()>;
    async fn add_assignees(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<()>;
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repo>;
    async fn get_pr(&self, owner: &str, repo: &str, number: u64) -> Result<Pr>;
    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        labels: &str,
        limit: u32,
    ) -> Result<Vec<Issue>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
struct WireLabel {
    name: String,
}

#[derive(Deserialize)]
struct WireUser {
    #[serde(default)]
    login: String,
}

#[derive(Deserialize)]
struct WireIssue {
    number: u64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<WireLabel>,
    #[serde(default)]
    user: Option<WireUser>,
}

impl From<WireIssue> for Issue {
    fn from(w: WireIssue) -> Self {
        Issue {
            number: w.number,
            state: w.state,
            title: w.title,
            body: w.body.unwrap_or_default(),
            labels: w.labels.into_iter().map(|l| l.name).collect(),
            author: w.user.map(|u| u.login).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct WireComment {
    #[serde(default)]
    body: String,
    #[serde(default)]
    user: Option<WireUser>,
}

#[derive(Deserialize, Default)]
struct WireRef {
    #[serde(default)]
    r#ref: String,
}

#[derive(Deserialize)]
struct WirePr {
    number: u64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    head: WireRef,
    #[serde(default)]
    base: WireRef,
}

impl From<WirePr> for Pr {
    fn from(w: WirePr) -> Self {
        Pr {
            number: w.number,
            state: w.state,
            title: w.title,
            body: w.body.unwrap_or_default(),
            head_ref: w.head.r#ref,
            base_ref: w.base.r#ref,
            url: w.html_url,
        }
    }
}

#[derive(Deserialize)]
struct WireRepo {
    #[serde(default)]
    default_branch: String,
    #[serde(default)]
    clone_url: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GitHubClient
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct GitHubClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base = if base_url.is_empty() {
            "https://api.github.com"
        } else {
            base_url
        };
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
        })
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .http
            .request(method, &url)
            .header("Accept", "application/vnd.github+json");
        if !self.token.is_empty() {
            builder = builder.bearer_auth(&self.token);
        }
        if let Some(payload) = payload {
            builder = builder.json(&payload);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::GitHost(format!(
                "{} {}: {}",
                status.as_u16(),
                path,
                body.trim()
            )));
        }
        if body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(Error::Json)
    }
}

#[async_trait]
impl GitHost for GitHubClient {
    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue> {
        let v = self
            .request(
                reqwest::Method::GET,
                &format!("/repos/{owner}/{repo}/issues/{number}"),
                None,
            )
            .await?;
        let wire: WireIssue = serde_json::from_value(v)?;
        Ok(wire.into())
    }

    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>> {
        let v = self
            .request(
                reqwest::Method::GET,
                &format!("/repos/{owner}/{repo}/issues/{number}/comments"),
                None,
            )
            .await?;
        let wire: Vec<WireComment> = serde_json::from_value(v)?;
        Ok(wire
            .into_iter()
            .map(|c| Comment {
                user: c.user.map(|u| u.login).unwrap_or_default(),
                body: c.body,
            })
            .collect())
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<()> {
        self.request(
            reqwest::Method::POST,
            &format!("/repos/{owner}/{repo}/issues/{number}/comments"),
            Some(json!({ "body": body })),
        )
        .await
        .map(|_| ())
    }

    async fn set_issue_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<()> {
        self.request(
            reqwest::Method::PUT,
            &format!("/repos/{owner}/{repo}/issues/{number}/labels"),
            Some(json!({ "labels": labels })),
        )
        .await
        .map(|_| ())
    }

    async fn create_pr(&self, owner: &str, repo: &str, req: &PrRequest) -> Result<Pr> {
        let v = self
            .request(
                reqwest::Method::POST,
                &format!("/repos/{owner}/{repo}/pulls"),
                Some(json!({
                    "title": req.title,
                    "body": req.body,
                    "head": req.head,
                    "base": req.base,
                })),
            )
            .await?;
        let wire: WirePr = serde_json::from_value(v)?;
        Ok(wire.into())
    }

    async fn update_pr_body(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<()> {
        self.request(
            reqwest::Method::PATCH,
            &format!("/repos/{owner}/{repo}/pulls/{number}"),
            Some(json!({ "body": body })),
        )
        .await
        .map(|_| ())
    }

    async fn add_assignees(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<()> {
        self.request(
            reqwest::Method::POST,
            &format!("/repos/{owner}/{repo}/issues/{number}/assignees"),
            Some(json!({ "assignees": assignees })),
        )
        .await
        .map(|_| ())
    }

    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repo> {
        let v = self
            .request(reqwest::Method::GET, &format!("/repos/{owner}/{repo}"), None)
            .await?;
        let wire: WireRepo = serde_json::from_value(v)?;
        Ok(Repo {
            default_branch: wire.default_branch,
            clone_url: wire.clone_url,
        })
    }

    async fn get_pr(&self, owner: &str, repo: &str, number: u64) -> Result<Pr> {
        let v = self
            .request(
                reqwest::Method::GET,
                &format!("/repos/{owner}/{repo}/pulls/{number}"),
                None,
            )
            .await?;
        let wire: WirePr = serde_json::from_value(v)?;
        Ok(wire.into())
    }

    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        labels: &str,
        limit: u32,
    ) -> Result<Vec<Issue>> {
        let state = if state.is_empty() { "open" } else { state };
        let mut path = format!("/repos/{owner}/{repo}/issues?state={state}&per_page={limit}");
        if !labels.is_empty() {
            path.push_str(&format!("&labels={labels}"));
        }
        let v = self.request(reqwest::Method::GET, &path, None).await?;
        let wire: Vec<WireIssue> = serde_json::from_value(v)?;
        Ok(wire.into_iter().map(Into::into).collect())
    }
}
