//! GitHub REST API tracker.
//!
//! Works with github.com and GitHub Enterprise (`https://host/api/v3`).
//!
//! Endpoints used:
//! - `POST  /repos/{owner}/{repo}/issues/{number}/comments`
//! - `PATCH /repos/{owner}/{repo}/issues/{number}`
//! - `POST  /repos/{owner}/{repo}/issues/{number}/labels`
//! - `POST  /repos/{owner}/{repo}/issues/{number}/assignees`
//! - `GET   /repos/{owner}/{repo}/contents/{path}`

use async_trait::async_trait;
use issuewright_config::GithubConfig;
use issuewright_core::{
    AddToIssue, CreateComment, EditIssue, GetContent, IssueList, IssueTracker, RepoContent,
    TrackerError,
};
use reqwest::{Method, RequestBuilder, Response, Url};
use std::time::Duration;
use tracing::{debug, warn};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// A tracker backed by the GitHub REST API.
pub struct GithubClient {
    base_url: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl GithubClient {
    /// Create a client for `base_url`, authenticating with `token` when given.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, TrackerError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| TrackerError::Network(format!("invalid API URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TrackerError::Network(format!(
                "API URL '{base_url}' cannot be used as a base"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TrackerError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    /// Create a client from the `[github]` config section.
    pub fn from_config(config: &GithubConfig) -> Result<Self, TrackerError> {
        Self::new(
            &config.api_url,
            config.token.clone(),
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Append path segments to the base URL, escaping each one.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn issue_url(&self, owner: &str, repo: &str, number: u64) -> Url {
        let number = number.to_string();
        self.endpoint(["repos", owner, repo, "issues", number.as_str()])
    }

    fn comments_url(&self, owner: &str, repo: &str, number: u64) -> Url {
        let number = number.to_string();
        self.endpoint(["repos", owner, repo, "issues", number.as_str(), "comments"])
    }

    fn list_url(&self, owner: &str, repo: &str, number: u64, list: IssueList) -> Url {
        let number = number.to_string();
        self.endpoint(["repos", owner, repo, "issues", number.as_str(), list.as_str()])
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> Url {
        let segments = ["repos", owner, repo, "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, TrackerError> {
        let response = builder
            .send()
            .await
            .map_err(|e| TrackerError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status, resource = what, body = %body, "GitHub returned error");
        Err(status_error(status, what, body))
    }
}

/// Map a non-success status to a tracker error.
fn status_error(status: u16, what: &str, body: String) -> TrackerError {
    match status {
        404 => TrackerError::NotFound(what.to_string()),
        401 => TrackerError::Api {
            status_code: status,
            message: "Invalid or missing token".into(),
        },
        403 => TrackerError::Api {
            status_code: status,
            message: format!("Insufficient permissions or rate limited: {body}"),
        },
        _ => TrackerError::Api {
            status_code: status,
            message: body,
        },
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    fn name(&self) -> &str {
        "github"
    }

    async fn create_comment(&self, request: CreateComment) -> Result<(), TrackerError> {
        let url = self.comments_url(&request.owner, &request.repo, request.number);
        let what = format!("{}/{}#{}", request.owner, request.repo, request.number);
        debug!(issue = %what, "Creating comment");

        let body = serde_json::json!({ "body": request.body });
        self.send(self.request(Method::POST, url).json(&body), &what)
            .await?;
        Ok(())
    }

    async fn edit_issue(&self, request: EditIssue) -> Result<(), TrackerError> {
        let url = self.issue_url(&request.owner, &request.repo, request.number);
        let what = format!("{}/{}#{}", request.owner, request.repo, request.number);
        debug!(issue = %what, edit = ?request.edit, "Editing issue");

        self.send(self.request(Method::PATCH, url).json(&request.edit), &what)
            .await?;
        Ok(())
    }

    async fn add_to_issue(&self, request: AddToIssue) -> Result<(), TrackerError> {
        let url = self.list_url(&request.owner, &request.repo, request.number, request.list);
        let what = format!("{}/{}#{}", request.owner, request.repo, request.number);
        debug!(issue = %what, list = %request.list, items = ?request.items, "Adding to issue");

        self.send(self.request(Method::POST, url).json(&add_body(&request)), &what)
            .await?;
        Ok(())
    }

    async fn get_content(&self, request: GetContent) -> Result<RepoContent, TrackerError> {
        let url = self.contents_url(&request.owner, &request.repo, &request.path);
        let what = format!("{}/{}:{}", request.owner, request.repo, request.path);
        debug!(location = %what, "Fetching content");

        let response = self.send(self.request(Method::GET, url), &what).await?;
        let text = response
            .text()
            .await
            .map_err(|e| TrackerError::Network(e.to_string()))?;
        parse_content(&text, &what)
    }
}

/// Body for the additive list endpoints, e.g. `{"labels": ["bug"]}`.
fn add_body(request: &AddToIssue) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert(request.list.as_str().into(), request.items.clone().into());
    serde_json::Value::Object(body)
}

/// Decode a contents response. Directories come back as arrays.
fn parse_content(text: &str, what: &str) -> Result<RepoContent, TrackerError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| TrackerError::InvalidResponse(format!("{what}: {e}")))?;
    if value.is_array() {
        return Err(TrackerError::InvalidResponse(format!(
            "{what} is a directory, not a file"
        )));
    }
    serde_json::from_value(value).map_err(|e| TrackerError::InvalidResponse(format!("{what}: {e}")))
}
