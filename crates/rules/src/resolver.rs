//! Content Resolver: turns `include()` / `contents()` path specs into text.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use issuewright_core::{GetContent, IssueTracker, RepoCoord, RepoPath, ResolutionError};
use std::sync::Arc;
use tracing::debug;

/// Text fetched from a repository, plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub location: RepoPath,
    pub text: String,
}

/// Fetches repository files through the tracker. Caches nothing.
#[derive(Clone)]
pub struct ContentResolver {
    tracker: Arc<dyn IssueTracker>,
}

impl ContentResolver {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    /// Resolve `spec` (`path` or `owner/repo:path`) against `active` and
    /// fetch it.
    pub async fn resolve(
        &self,
        spec: &str,
        active: Option<&RepoCoord>,
    ) -> Result<ResolvedContent, ResolutionError> {
        let location = RepoPath::parse(spec, active)?;
        self.fetch(location).await
    }

    /// Fetch an already-resolved location.
    pub async fn fetch(&self, location: RepoPath) -> Result<ResolvedContent, ResolutionError> {
        debug!(repo = %location.coord(), path = %location.path, "Fetching content");

        let content = self
            .tracker
            .get_content(GetContent::from(&location))
            .await
            .map_err(|source| ResolutionError::Fetch {
                location: location.to_string(),
                source,
            })?;

        let decoded = match content.encoding.as_deref() {
            None | Some("base64") => decode_content(&content.content),
            // Files over 1 MB come back as `"encoding": "none"` with no content.
            Some(other) => Err(format!("unsupported encoding '{other}'")),
        };
        let text = decoded.map_err(|reason| ResolutionError::Decode {
            location: location.to_string(),
            reason,
        })?;

        debug!(location = %location, bytes = text.len(), "Content resolved");
        Ok(ResolvedContent { location, text })
    }
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver")
            .field("tracker", &self.tracker.name())
            .finish()
    }
}

/// Decode a base64 content field into UTF-8 text.
///
/// Whitespace is ignored, since the GitHub API wraps encoded content at 60
/// columns.
pub fn decode_content(encoded: &str) -> Result<String, String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64: {e}"))?;
    String::from_utf8(bytes).map_err(|e| format!("content is not UTF-8: {e}"))
}
