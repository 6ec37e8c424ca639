//! In-memory tracker. Serves files from memory or a local directory and
//! records every write. Useful for tests and offline runs.

use async_trait::async_trait;
use issuewright_core::{
    AddToIssue, CreateComment, EditIssue, GetContent, IssueTracker, RepoContent, TrackerError,
};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// A tracker that keeps everything in memory.
///
/// Content lookups check seeded files first, then `<root>/<owner>/<repo>/<path>`
/// when a root directory is set. Anything else is [`TrackerError::NotFound`].
#[derive(Default)]
pub struct MemoryTracker {
    files: RwLock<HashMap<GetContent, String>>,
    root: Option<PathBuf>,
    comments: RwLock<Vec<CreateComment>>,
    edits: RwLock<Vec<EditIssue>>,
    additions: RwLock<Vec<AddToIssue>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve repository files from `<root>/<owner>/<repo>/<path>`.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Seed a file (builder form).
    pub fn with_file(mut self, owner: &str, repo: &str, path: &str, text: &str) -> Self {
        self.files
            .get_mut()
            .insert(key(owner, repo, path), text.to_string());
        self
    }

    /// Seed a file.
    pub async fn insert_file(&self, owner: &str, repo: &str, path: &str, text: &str) {
        self.files
            .write()
            .await
            .insert(key(owner, repo, path), text.to_string());
    }

    pub async fn comments(&self) -> Vec<CreateComment> {
        self.comments.read().await.clone()
    }

    pub async fn edits(&self) -> Vec<EditIssue> {
        self.edits.read().await.clone()
    }

    pub async fn additions(&self) -> Vec<AddToIssue> {
        self.additions.read().await.clone()
    }

    async fn read_from_root(&self, request: &GetContent) -> Option<String> {
        let root = self.root.as_ref()?;
        let path = local_path(root, request)?;
        debug!(path = %path.display(), "Reading content from disk");
        tokio::fs::read_to_string(&path).await.ok()
    }
}

fn key(owner: &str, repo: &str, path: &str) -> GetContent {
    GetContent {
        owner: owner.into(),
        repo: repo.into(),
        path: path.trim_start_matches('/').into(),
    }
}

/// Map a request onto the content directory, refusing anything that would
/// escape it.
fn local_path(root: &Path, request: &GetContent) -> Option<PathBuf> {
    let relative = Path::new(&request.owner)
        .join(&request.repo)
        .join(request.path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

#[async_trait]
impl IssueTracker for MemoryTracker {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_comment(&self, request: CreateComment) -> Result<(), TrackerError> {
        self.comments.write().await.push(request);
        Ok(())
    }

    async fn edit_issue(&self, request: EditIssue) -> Result<(), TrackerError> {
        self.edits.write().await.push(request);
        Ok(())
    }

    async fn add_to_issue(&self, request: AddToIssue) -> Result<(), TrackerError> {
        self.additions.write().await.push(request);
        Ok(())
    }

    async fn get_content(&self, request: GetContent) -> Result<RepoContent, TrackerError> {
        let lookup = key(&request.owner, &request.repo, &request.path);
        if let Some(text) = self.files.read().await.get(&lookup) {
            return Ok(RepoContent::from_text(text));
        }
        match self.read_from_root(&lookup).await {
            Some(text) => Ok(RepoContent::from_text(&text)),
            None => Err(TrackerError::NotFound(format!(
                "{}/{}:{}",
                request.owner, request.repo, request.path
            ))),
        }
    }
}
