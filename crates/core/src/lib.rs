//! # issuewright core
//!
//! Domain types, traits, and error definitions shared by every issuewright
//! crate. Nothing here performs I/O: the outside world is reached through the
//! [`IssueTracker`] trait, whose implementations live in `issuewright-tracker`.
//!
//! ## Pieces
//!
//! - [`EventContext`]: the immutable view of one inbound webhook event
//! - [`RepoCoord`] / [`RepoPath`]: repository coordinates and `owner/repo:path` specs
//! - [`IssueTracker`]: the narrow capability rules act through
//! - [`Error`]: the error taxonomy, one enum per bounded context

pub mod context;
pub mod error;
pub mod repo;
pub mod tracker;

pub use context::{Event, EventContext};
pub use error::{ActionError, Error, ResolutionError, Result, TrackerError};
pub use repo::{RepoCoord, RepoPath};
pub use tracker::{
    AddToIssue, CreateComment, EditIssue, GetContent, IssueEdit, IssueList, IssueState,
    IssueTracker, RepoContent,
};
