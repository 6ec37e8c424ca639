//! Issue tracker implementations for issuewright.
//!
//! All trackers implement the `issuewright_core::IssueTracker` trait.
//! The CLI picks one based on configuration and flags.

pub mod dry_run;
pub mod github;
pub mod memory;

pub use dry_run::{DryRunTracker, PlannedCall};
pub use github::GithubClient;
pub use memory::MemoryTracker;
