//! IssueTracker trait: the only capability rules act through.
//!
//! The rule engine needs four calls: post a comment, edit an issue, add to
//! one of an issue's lists, and read a file from a repository. Transport,
//! authentication and retries belong to the implementation.

use crate::error::TrackerError;
use crate::repo::RepoPath;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Create a comment on an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateComment {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub body: String,
}

/// Issue state as understood by the edit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// A partial edit. Only fields that are `Some` are sent.
///
/// Labels and assignees are not part of an edit: setting them here would
/// replace the issue's whole list. Use [`AddToIssue`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
}

impl IssueEdit {
    pub fn state(state: IssueState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }
}

/// Edit an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditIssue {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    #[serde(flatten)]
    pub edit: IssueEdit,
}

/// An issue list that can be appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueList {
    Labels,
    Assignees,
}

impl IssueList {
    /// The list's name in the tracker's API.
    pub fn as_str(self) -> &'static str {
        match self {
            IssueList::Labels => "labels",
            IssueList::Assignees => "assignees",
        }
    }
}

impl fmt::Display for IssueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Add items to one of an issue's lists. Items already present are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToIssue {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub list: IssueList,
    pub items: Vec<String>,
}

/// Read one file from a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GetContent {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl From<&RepoPath> for GetContent {
    fn from(path: &RepoPath) -> Self {
        Self {
            owner: path.owner.clone(),
            repo: path.repo.clone(),
            path: path.path.clone(),
        }
    }
}

/// File content as returned by the tracker: base64 in `content`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContent {
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl RepoContent {
    /// Wrap plain text the way the tracker would return it.
    pub fn from_text(text: &str) -> Self {
        Self {
            content: STANDARD.encode(text.as_bytes()),
            encoding: Some("base64".into()),
            path: None,
            sha: None,
        }
    }
}

/// The issue-tracker capability.
///
/// Implementations must be cheap to share (`Arc<dyn IssueTracker>`) and must
/// not retry on their own account unless configured to.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Short name used in logs (e.g. "github", "memory").
    fn name(&self) -> &str;

    async fn create_comment(&self, request: CreateComment) -> Result<(), TrackerError>;

    async fn edit_issue(&self, request: EditIssue) -> Result<(), TrackerError>;

    /// Append to an issue's labels or assignees without touching the
    /// existing entries.
    async fn add_to_issue(&self, request: AddToIssue) -> Result<(), TrackerError>;

    async fn get_content(&self, request: GetContent) -> Result<RepoContent, TrackerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::RepoCoord;

    #[test]
    fn edit_serializes_only_present_fields() {
        let edit = EditIssue {
            owner: "o".into(),
            repo: "r".into(),
            number: 3,
            edit: IssueEdit::state(IssueState::Closed),
        };
        let value = serde_json::to_value(&edit).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"owner": "o", "repo": "r", "number": 3, "state": "closed"})
        );
    }

    #[test]
    fn list_names_match_api_fields() {
        assert_eq!(IssueList::Labels.as_str(), "labels");
        assert_eq!(IssueList::Assignees.to_string(), "assignees");
        let value = serde_json::to_value(IssueList::Assignees).unwrap();
        assert_eq!(value, serde_json::json!("assignees"));
    }

    #[test]
    fn get_content_from_repo_path() {
        let path = RepoPath::new(&RepoCoord::new("other", "repo"), "script-b.js");
        let request = GetContent::from(&path);
        assert_eq!(request.owner, "other");
        assert_eq!(request.repo, "repo");
        assert_eq!(request.path, "script-b.js");
    }

    #[test]
    fn content_from_text_is_base64() {
        let content = RepoContent::from_text("file contents");
        assert_eq!(content.content, "ZmlsZSBjb250ZW50cw==");
        assert_eq!(content.encoding.as_deref(), Some("base64"));
    }

    #[test]
    fn content_deserializes_with_missing_fields() {
        let content: RepoContent = serde_json::from_str(r#"{"content": ""}"#).unwrap();
        assert!(content.content.is_empty());
        assert!(content.sha.is_none());
    }
}
