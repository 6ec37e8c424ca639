//! Rule scripts: react to issue-tracker events with a small, closed DSL.
//!
//! A script registers rules against event patterns, narrows them with
//! predicates, and ends each chain with one action verb. Scripts may pull in
//! other scripts with `include()` and load action arguments from repository
//! files with `contents()`; both are fetched lazily, when execution reaches
//! them, through the [`IssueTracker`](issuewright_core::IssueTracker).
//!
//! Parsing never touches the network. [`configure`] only records each
//! `include()` together with the repository it was written in; the file is
//! fetched when [`Configuration::execute`] reaches it, not at parse time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌──────────────┐
//! │  script  │──▶│ Script::parse│──▶│Configuration│──▶│ IssueTracker │
//! │   text   │   │ (lexer+parser│   │  execute()  │   │ comment/edit │
//! └──────────┘   └──────────────┘   └─────┬──────┘   └──────▲───────┘
//!                                         │  include()/      │
//!                                         │  contents()      │
//!                                   ┌─────▼──────┐           │
//!                                   │  Content   │───────────┘
//!                                   │  Resolver  │  get_content
//!                                   └────────────┘
//! ```
//!
//! # Example Script
//!
//! ```js
//! // Greet new issues with the reply template from this repository
//! on("issues.opened").comment(contents(".github/ISSUE_REPLY_TEMPLATE"));
//!
//! // Close anything labeled wontfix
//! on("issues.labeled")
//!   .filter((e) => e.payload.label.name == "wontfix")
//!   .close();
//!
//! // Shared rules from another repository
//! include("acme/policies:triage.js");
//! ```

mod actions;
mod engine;
mod lexer;
mod model;
mod parser;
mod pattern;
mod predicate;
mod resolver;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use actions::perform;
pub use engine::{
    Configuration, EngineOptions, ExecutionMode, ExecutionReport, FiredRule, RuleFailure,
};
pub use model::{Action, ArgExpr, Arity, Entry, Include, Rule, Script, Verb};
pub use pattern::EventPattern;
pub use predicate::Predicate;
pub use resolver::{ContentResolver, ResolvedContent, decode_content};

use issuewright_core::{EventContext, IssueTracker};
use std::sync::Arc;

/// Errors raised while parsing a script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid event pattern at line {line}: {detail}")]
    InvalidPattern { line: usize, detail: String },

    #[error("unknown action '{name}' at line {line}")]
    UnknownVerb { name: String, line: usize },

    #[error("unknown function '{name}' at line {line}")]
    UnknownFunction { name: String, line: usize },

    #[error("unknown identifier '{name}' at line {line}")]
    UnknownIdentifier { name: String, line: usize },

    #[error("rule at line {line} already has an action; cannot chain '{name}'")]
    AlreadyFinalized { name: String, line: usize },

    #[error("rule at line {line} has no action")]
    MissingAction { line: usize },

    #[error("'{name}' at line {line} takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        line: usize,
        expected: String,
        found: usize,
    },

    #[error("invalid regular expression at line {line}: {detail}")]
    InvalidRegex { line: usize, detail: String },
}

/// Shorthand for `Configuration::new(tracker, context).parse(text)`.
pub fn configure(
    tracker: Arc<dyn IssueTracker>,
    context: EventContext,
    text: &str,
) -> Result<Configuration, ParseError> {
    Configuration::new(tracker, context).parse(text)
}
