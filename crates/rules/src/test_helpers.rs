//! Shared test helpers for rule tests.

use issuewright_core::{
    AddToIssue, CreateComment, EditIssue, GetContent, IssueTracker, RepoContent, TrackerError,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// A tracker that serves seeded files and records every call.
///
/// Content requests for files that were never seeded fail with
/// [`TrackerError::NotFound`].
#[derive(Default)]
pub struct RecordingTracker {
    files: HashMap<GetContent, RepoContent>,
    comments: Mutex<Vec<CreateComment>>,
    edits: Mutex<Vec<EditIssue>>,
    additions: Mutex<Vec<AddToIssue>>,
    content_requests: Mutex<Vec<GetContent>>,
    fail_writes: Option<TrackerError>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a text file.
    pub fn with_file(self, owner: &str, repo: &str, path: &str, text: &str) -> Self {
        self.with_content(owner, repo, path, RepoContent::from_text(text))
    }

    /// Seed a raw content response.
    pub fn with_content(mut self, owner: &str, repo: &str, path: &str, content: RepoContent) -> Self {
        self.files.insert(
            GetContent {
                owner: owner.into(),
                repo: repo.into(),
                path: path.into(),
            },
            content,
        );
        self
    }

    /// Make every write fail with `error`.
    pub fn failing_writes(mut self, error: TrackerError) -> Self {
        self.fail_writes = Some(error);
        self
    }

    pub fn comments(&self) -> Vec<CreateComment> {
        self.comments.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<EditIssue> {
        self.edits.lock().unwrap().clone()
    }

    pub fn additions(&self) -> Vec<AddToIssue> {
        self.additions.lock().unwrap().clone()
    }

    pub fn content_requests(&self) -> Vec<GetContent> {
        self.content_requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IssueTracker for RecordingTracker {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_comment(&self, request: CreateComment) -> Result<(), TrackerError> {
        if let Some(error) = &self.fail_writes {
            return Err(error.clone());
        }
        self.comments.lock().unwrap().push(request);
        Ok(())
    }

    async fn edit_issue(&self, request: EditIssue) -> Result<(), TrackerError> {
        if let Some(error) = &self.fail_writes {
            return Err(error.clone());
        }
        self.edits.lock().unwrap().push(request);
        Ok(())
    }

    async fn add_to_issue(&self, request: AddToIssue) -> Result<(), TrackerError> {
        if let Some(error) = &self.fail_writes {
            return Err(error.clone());
        }
        self.additions.lock().unwrap().push(request);
        Ok(())
    }

    async fn get_content(&self, request: GetContent) -> Result<RepoContent, TrackerError> {
        self.content_requests.lock().unwrap().push(request.clone());
        self.files.get(&request).cloned().ok_or_else(|| {
            TrackerError::NotFound(format!("{}/{}:{}", request.owner, request.repo, request.path))
        })
    }
}
