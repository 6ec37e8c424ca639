//! Repository coordinates and `owner/repo:path` specs.

use crate::error::ResolutionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoCoord {
    pub owner: String,
    pub repo: String,
}

impl RepoCoord {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse `owner/repo`. Returns `None` unless both halves are non-empty
    /// and free of separators.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, repo) = s.trim().split_once('/')?;
        if !is_segment(owner) || !is_segment(repo) {
            return None;
        }
        Some(Self::new(owner, repo))
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && !s
            .chars()
            .any(|c| c == '/' || c == ':' || c.is_whitespace())
}

impl fmt::Display for RepoCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoCoord {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ResolutionError::InvalidPath(s.to_string()))
    }
}

/// A file inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoPath {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl RepoPath {
    pub fn new(coord: &RepoCoord, path: impl Into<String>) -> Self {
        Self {
            owner: coord.owner.clone(),
            repo: coord.repo.clone(),
            path: path.into(),
        }
    }

    /// Parse a path spec.
    ///
    /// `owner/repo:path` names a file explicitly. Anything else is a path
    /// inside `active`, the repository of the script doing the asking.
    pub fn parse(spec: &str, active: Option<&RepoCoord>) -> Result<Self, ResolutionError> {
        let spec = spec.trim();
        if let Some((prefix, path)) = spec.split_once(':') {
            if let Some(coord) = RepoCoord::parse(prefix) {
                let path = normalize(path);
                if path.is_empty() {
                    return Err(ResolutionError::InvalidPath(spec.to_string()));
                }
                return Ok(Self::new(&coord, path));
            }
        }

        let path = normalize(spec);
        if path.is_empty() {
            return Err(ResolutionError::InvalidPath(spec.to_string()));
        }
        let coord = active.ok_or_else(|| ResolutionError::NoActiveRepository(spec.to_string()))?;
        Ok(Self::new(coord, path))
    }

    /// The repository this file lives in.
    pub fn coord(&self) -> RepoCoord {
        RepoCoord::new(&self.owner, &self.repo)
    }
}

fn normalize(path: &str) -> &str {
    path.trim().trim_start_matches('/')
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.owner, self.repo, self.path)
    }
}
