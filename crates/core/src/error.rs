//! Error types for the issuewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for issuewright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Issue tracker client ---
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    // --- Content / include resolution ---
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    // --- Rule actions ---
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by an [`IssueTracker`](crate::IssueTracker) implementation.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Failures while turning a path spec into text (`include()` / `contents()`).
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("Invalid path spec: '{0}'")]
    InvalidPath(String),

    #[error("No active repository to resolve '{0}' against")]
    NoActiveRepository(String),

    #[error("Failed to fetch {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: TrackerError,
    },

    #[error("Failed to decode {location}: {reason}")]
    Decode { location: String, reason: String },

    #[error("Include cycle detected at {location}")]
    IncludeCycle { location: String },

    #[error("Include depth limit of {limit} exceeded at {location}")]
    IncludeDepth { location: String, limit: usize },

    #[error("Included script {location} is invalid: {message}")]
    Parse { location: String, message: String },
}

/// Failures while performing a matched rule's action.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("Event has no repository to act on")]
    MissingRepository,

    #[error("Event '{event}' carries no issue number")]
    MissingIssueNumber { event: String },

    #[error("Argument could not be resolved: {0}")]
    Argument(#[from] ResolutionError),

    #[error("Tracker call failed: {0}")]
    Tracker(#[from] TrackerError),
}
