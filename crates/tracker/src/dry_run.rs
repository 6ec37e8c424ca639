//! Dry-run tracker: reads go to a real tracker, writes are only recorded.

use async_trait::async_trait;
use issuewright_core::{
    AddToIssue, CreateComment, EditIssue, GetContent, IssueTracker, RepoContent, TrackerError,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// A write that a dry run skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedCall {
    Comment(CreateComment),
    Edit(EditIssue),
    Add(AddToIssue),
}

impl fmt::Display for PlannedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedCall::Comment(c) => write!(
                f,
                "comment on {}/{}#{}: {:?}",
                c.owner, c.repo, c.number, c.body
            ),
            PlannedCall::Edit(e) => {
                let edit = serde_json::to_string(&e.edit).unwrap_or_default();
                write!(f, "edit {}/{}#{}: {edit}", e.owner, e.repo, e.number)
            }
            PlannedCall::Add(a) => write!(
                f,
                "add {} to {}/{}#{}: {:?}",
                a.list, a.owner, a.repo, a.number, a.items
            ),
        }
    }
}

/// Wraps another tracker, passing `get_content` through and recording
/// every write instead of sending it.
pub struct DryRunTracker {
    inner: Arc<dyn IssueTracker>,
    planned: RwLock<Vec<PlannedCall>>,
}

impl DryRunTracker {
    pub fn new(inner: Arc<dyn IssueTracker>) -> Self {
        Self {
            inner,
            planned: RwLock::new(Vec::new()),
        }
    }

    /// Writes skipped so far, in call order.
    pub async fn planned(&self) -> Vec<PlannedCall> {
        self.planned.read().await.clone()
    }
}

#[async_trait]
impl IssueTracker for DryRunTracker {
    fn name(&self) -> &str {
        "dry_run"
    }

    async fn create_comment(&self, request: CreateComment) -> Result<(), TrackerError> {
        let call = PlannedCall::Comment(request);
        info!(call = %call, "Dry run: skipping write");
        self.planned.write().await.push(call);
        Ok(())
    }

    async fn edit_issue(&self, request: EditIssue) -> Result<(), TrackerError> {
        let call = PlannedCall::Edit(request);
        info!(call = %call, "Dry run: skipping write");
        self.planned.write().await.push(call);
        Ok(())
    }

    async fn add_to_issue(&self, request: AddToIssue) -> Result<(), TrackerError> {
        let call = PlannedCall::Add(request);
        info!(call = %call, "Dry run: skipping write");
        self.planned.write().await.push(call);
        Ok(())
    }

    async fn get_content(&self, request: GetContent) -> Result<RepoContent, TrackerError> {
        self.inner.get_content(request).await
    }
}
