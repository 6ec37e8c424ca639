//! Execution engine.
//!
//! A [`Configuration`] holds the parsed entries of a root script plus the
//! tracker they act through. Executing it walks the entries in registration
//! order, fires every rule whose pattern and filters match, and expands
//! `include()` entries in place by fetching, parsing and running the nested
//! script. The result is an [`ExecutionReport`]; a rule that does not match
//! is not an error.

use crate::ParseError;
use crate::actions::perform;
use crate::model::{Entry, Include, Rule, Script, Verb};
use crate::resolver::ContentResolver;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use issuewright_core::{EventContext, IssueTracker, RepoPath, ResolutionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default limit on nested `include()` levels.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 8;

/// How the entries of one script level are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Await each entry before starting the next.
    #[default]
    Sequential,
    /// Start every entry of a level at once and wait for all of them.
    Concurrent,
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!(
                "unknown execution mode '{other}' (expected 'sequential' or 'concurrent')"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub mode: ExecutionMode,
    pub max_include_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

/// A rule whose action completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredRule {
    /// The rule in script form, e.g. `on("issues").close()`.
    pub rule: String,
    pub verb: Verb,
    /// Repository and line the rule was parsed from.
    pub location: String,
}

/// A rule action or include that failed.
#[derive(Debug)]
pub struct RuleFailure {
    /// The failing rule or include, with its location.
    pub origin: String,
    pub error: issuewright_core::Error,
}

/// What happened when a configuration ran against one event.
#[derive(Debug)]
pub struct ExecutionReport {
    pub event: String,
    pub action: String,
    /// Rules whose pattern matched the event, including filtered ones.
    pub matched: usize,
    pub fired: Vec<FiredRule>,
    pub failures: Vec<RuleFailure>,
    /// Locations of the scripts pulled in by `include()`.
    pub includes: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn matched(&self) -> usize {
        self.matched
    }

    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Turn the first failure into an error, for callers that want
    /// fail-fast semantics.
    pub fn into_result(mut self) -> issuewright_core::Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(self.failures.remove(0).error)
        }
    }
}

/// Result of running one entry.
enum Outcome {
    Unmatched,
    Filtered,
    Fired(FiredRule),
    ActionFailed(RuleFailure),
    Included(String),
    IncludeFailed(RuleFailure),
}

/// The event being executed and its predicate view, built once per run.
struct Scope<'a> {
    ctx: &'a EventContext,
    view: Value,
}

/// Scripts currently being expanded, root first.
#[derive(Debug, Clone, Default)]
struct IncludeStack {
    root: Option<RepoPath>,
    chain: Vec<RepoPath>,
}

impl IncludeStack {
    fn contains(&self, location: &RepoPath) -> bool {
        self.root.as_ref() == Some(location) || self.chain.contains(location)
    }

    fn depth(&self) -> usize {
        self.chain.len()
    }

    fn push(&self, location: RepoPath) -> Self {
        let mut next = self.clone();
        next.chain.push(location);
        next
    }
}

/// A parsed root script bound to a tracker and an event.
pub struct Configuration {
    tracker: Arc<dyn IssueTracker>,
    resolver: ContentResolver,
    context: EventContext,
    script: Script,
    /// Where the root script was fetched from, when it was fetched.
    root: Option<RepoPath>,
    options: EngineOptions,
}

impl Configuration {
    /// An empty configuration. Its origin is the context's repository.
    pub fn new(tracker: Arc<dyn IssueTracker>, context: EventContext) -> Self {
        let script = Script::empty(context.repository().cloned());
        Self {
            resolver: ContentResolver::new(tracker.clone()),
            tracker,
            context,
            script,
            root: None,
            options: EngineOptions::default(),
        }
    }

    /// Fetch the root script at `spec` and parse it. Relative specs resolve
    /// against the context's repository; the script's own `include()` and
    /// `contents()` calls resolve against the repository it came from.
    pub async fn load(
        tracker: Arc<dyn IssueTracker>,
        context: EventContext,
        spec: &str,
    ) -> Result<Self, ResolutionError> {
        let mut config = Self::new(tracker, context);
        let resolved = config
            .resolver
            .resolve(spec, config.context.repository())
            .await?;
        config.script = parse_fetched(&resolved.text, &resolved.location)?;
        info!(
            location = %resolved.location,
            entries = config.script.len(),
            "Loaded rule script"
        );
        config.root = Some(resolved.location);
        Ok(config)
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse `text` and append its entries.
    pub fn parse(mut self, text: &str) -> Result<Self, ParseError> {
        let parsed = Script::parse(text, self.script.origin().cloned())?;
        debug!(entries = parsed.len(), "Parsed rule script");
        self.script.extend(parsed);
        Ok(self)
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Run against the context the configuration was built with.
    pub async fn execute(&self) -> ExecutionReport {
        self.execute_for(&self.context).await
    }

    /// Run against `ctx`.
    pub async fn execute_for(&self, ctx: &EventContext) -> ExecutionReport {
        let started_at = Utc::now();
        debug!(
            event = ctx.event(),
            action = ctx.action(),
            entries = self.script.len(),
            "Executing rules"
        );

        let stack = IncludeStack {
            root: self.root.clone(),
            chain: Vec::new(),
        };
        let scope = Scope {
            ctx,
            view: ctx.to_value(),
        };
        let outcomes = self.run_entries(self.script.entries(), &scope, &stack).await;

        let mut report = ExecutionReport {
            event: ctx.event().to_string(),
            action: ctx.action().to_string(),
            matched: 0,
            fired: Vec::new(),
            failures: Vec::new(),
            includes: Vec::new(),
            started_at,
            finished_at: started_at,
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Unmatched => {}
                Outcome::Filtered => report.matched += 1,
                Outcome::Fired(fired) => {
                    report.matched += 1;
                    report.fired.push(fired);
                }
                Outcome::ActionFailed(failure) => {
                    report.matched += 1;
                    report.failures.push(failure);
                }
                Outcome::Included(location) => report.includes.push(location),
                Outcome::IncludeFailed(failure) => report.failures.push(failure),
            }
        }
        report.finished_at = Utc::now();

        info!(
            event = %report.event,
            action = %report.action,
            matched = report.matched,
            fired = report.fired.len(),
            failed = report.failures.len(),
            "Rules executed"
        );
        report
    }

    fn run_entries<'a>(
        &'a self,
        entries: &'a [Entry],
        scope: &'a Scope<'a>,
        stack: &'a IncludeStack,
    ) -> BoxFuture<'a, Vec<Outcome>> {
        async move {
            match self.options.mode {
                ExecutionMode::Sequential => {
                    let mut outcomes = Vec::new();
                    for entry in entries {
                        outcomes.extend(self.run_entry(entry, scope, stack).await);
                    }
                    outcomes
                }
                ExecutionMode::Concurrent => {
                    join_all(entries.iter().map(|entry| self.run_entry(entry, scope, stack)))
                        .await
                        .into_iter()
                        .flatten()
                        .collect()
                }
            }
        }
        .boxed()
    }

    async fn run_entry(
        &self,
        entry: &Entry,
        scope: &Scope<'_>,
        stack: &IncludeStack,
    ) -> Vec<Outcome> {
        match entry {
            Entry::Rule(rule) => vec![self.run_rule(rule, scope).await],
            Entry::Include(include) => self.run_include(include, scope, stack).await,
        }
    }

    async fn run_rule(&self, rule: &Rule, scope: &Scope<'_>) -> Outcome {
        if !rule.matches(scope.ctx) {
            return Outcome::Unmatched;
        }

        if let Some(filter) = rule.filters.iter().find(|f| !f.evaluate_view(&scope.view)) {
            debug!(rule = %rule.location(), filter = %filter, "Filter rejected event");
            return Outcome::Filtered;
        }

        match perform(&rule.action, scope.ctx, self.tracker.as_ref(), &self.resolver).await {
            Ok(()) => {
                info!(rule = %rule.location(), action = %rule.action, "Rule fired");
                Outcome::Fired(FiredRule {
                    rule: rule.to_string(),
                    verb: rule.action.verb(),
                    location: rule.location(),
                })
            }
            Err(e) => {
                warn!(rule = %rule.location(), action = %rule.action, error = %e, "Rule action failed");
                Outcome::ActionFailed(RuleFailure {
                    origin: format!("{} ({})", rule.action, rule.location()),
                    error: e.into(),
                })
            }
        }
    }

    async fn run_include(
        &self,
        include: &Include,
        scope: &Scope<'_>,
        stack: &IncludeStack,
    ) -> Vec<Outcome> {
        let (location, script) = match self.load_include(include, stack).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(include = %include.spec, line = include.line, error = %e, "Include failed");
                let site = match &include.origin {
                    Some(origin) => format!("{include} ({origin} line {})", include.line),
                    None => format!("{include} (line {})", include.line),
                };
                return vec![Outcome::IncludeFailed(RuleFailure {
                    origin: site,
                    error: e.into(),
                })];
            }
        };

        debug!(location = %location, entries = script.len(), "Expanding include");
        let nested = stack.push(location.clone());
        let mut outcomes = vec![Outcome::Included(location.to_string())];
        outcomes.extend(self.run_entries(script.entries(), scope, &nested).await);
        outcomes
    }

    async fn load_include(
        &self,
        include: &Include,
        stack: &IncludeStack,
    ) -> Result<(RepoPath, Script), ResolutionError> {
        let location = RepoPath::parse(&include.spec, include.origin.as_ref())?;
        if stack.contains(&location) {
            return Err(ResolutionError::IncludeCycle {
                location: location.to_string(),
            });
        }
        if stack.depth() >= self.options.max_include_depth {
            return Err(ResolutionError::IncludeDepth {
                location: location.to_string(),
                limit: self.options.max_include_depth,
            });
        }

        let resolved = self.resolver.fetch(location).await?;
        let script = parse_fetched(&resolved.text, &resolved.location)?;
        Ok((resolved.location, script))
    }
}

/// Parse fetched script text; its origin is the repository it came from.
fn parse_fetched(text: &str, location: &RepoPath) -> Result<Script, ResolutionError> {
    Script::parse(text, Some(location.coord())).map_err(|e| ResolutionError::Parse {
        location: location.to_string(),
        message: e.to_string(),
    })
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("tracker", &self.tracker.name())
            .field("origin", &self.script.origin())
            .field("entries", &self.script.len())
            .field("options", &self.options)
            .finish()
    }
}
