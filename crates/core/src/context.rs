//! Event context: the read-only view of one inbound webhook event.
//!
//! Payloads come from the outside world and may be partial. Every accessor
//! returns `Option`/empty values for missing fields instead of failing, so a
//! malformed payload only ever makes rules not match.

use crate::repo::RepoCoord;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// An event as delivered by the webhook layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The topic, e.g. `issues` or `issue_comment`.
    pub event: String,

    /// The raw webhook payload.
    #[serde(default)]
    pub payload: Value,

    /// An explicit issue object, when the delivering layer has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<Value>,
}

impl Event {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
            issue: None,
        }
    }
}

/// Immutable context for evaluating rules against one event.
#[derive(Debug, Clone)]
pub struct EventContext {
    event: String,
    action: String,
    payload: Value,
    issue: Option<Value>,
    repository: Option<RepoCoord>,
}

impl EventContext {
    pub fn new(event: Event) -> Self {
        Self::with_default_repo(event, None)
    }

    /// Build a context, using `default_repo` when the payload carries no
    /// `repository` block.
    pub fn with_default_repo(event: Event, default_repo: Option<RepoCoord>) -> Self {
        let action = event
            .payload
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let repository = repository_from_payload(&event.payload).or(default_repo);
        Self {
            event: event.event,
            action,
            payload: event.payload,
            issue: event.issue,
            repository,
        }
    }

    /// The event topic (`issues`, `pull_request`, ...).
    pub fn event(&self) -> &str {
        &self.event
    }

    /// `payload.action`, or the empty string.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn repository(&self) -> Option<&RepoCoord> {
        self.repository.as_ref()
    }

    /// The issue this event is about: the explicit one if it is non-empty,
    /// then `payload.issue`, then `payload.pull_request`.
    pub fn issue(&self) -> Option<&Value> {
        self.issue
            .as_ref()
            .filter(|issue| issue.as_object().is_some_and(|o| !o.is_empty()))
            .or_else(|| self.payload.get("issue"))
            .or_else(|| self.payload.get("pull_request"))
    }

    /// The issue (or pull request) number actions operate on.
    pub fn issue_number(&self) -> Option<u64> {
        self.issue()
            .and_then(|issue| issue.get("number"))
            .and_then(Value::as_u64)
            .or_else(|| self.payload.get("number").and_then(Value::as_u64))
    }

    /// The JSON view handed to filter predicates.
    pub fn to_value(&self) -> Value {
        json!({
            "event": self.event,
            "action": self.action,
            "payload": self.payload,
            "issue": self.issue().cloned().unwrap_or(Value::Null),
            "repo": self.repository.as_ref().map(|r| json!({
                "owner": r.owner,
                "repo": r.repo,
            })).unwrap_or(Value::Null),
        })
    }
}

fn repository_from_payload(payload: &Value) -> Option<RepoCoord> {
    let repository = payload.get("repository")?;
    let owner = repository
        .get("owner")
        .and_then(|o| o.get("login"))
        .and_then(Value::as_str)?;
    let name = repository.get("name").and_then(Value::as_str)?;
    Some(RepoCoord::new(owner, name))
}
