//! `issuewright run`: run a rule script against one webhook payload.

use clap::Args;
use issuewright_config::AppConfig;
use issuewright_core::{Event, EventContext, IssueTracker, RepoCoord};
use issuewright_rules::{Configuration, EngineOptions, ExecutionMode, ExecutionReport};
use issuewright_tracker::{DryRunTracker, GithubClient, MemoryTracker, PlannedCall};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Event topic, e.g. `issues` or `issue_comment`
    #[arg(short, long)]
    pub event: String,

    /// Webhook payload JSON file
    #[arg(short, long)]
    pub payload: PathBuf,

    /// Local script file (default: fetch `rules.script` from the repository)
    #[arg(short, long, conflicts_with = "remote")]
    pub script: Option<PathBuf>,

    /// Script path spec to fetch, `path` or `owner/repo:path`
    #[arg(long)]
    pub remote: Option<String>,

    /// Repository to act on when the payload has none (`owner/repo`)
    #[arg(long)]
    pub repo: Option<String>,

    /// Fetch content but only print comments and edits
    #[arg(long)]
    pub dry_run: bool,

    /// Serve repository files from `<dir>/<owner>/<repo>/<path>` (implies --dry-run)
    #[arg(long)]
    pub content_dir: Option<PathBuf>,

    /// Run the rules of each script level concurrently
    #[arg(long)]
    pub concurrent: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let (report, planned) = execute(&args, &config).await?;

    println!(
        "Event {}.{}: {} matched, {} fired, {} failed in {}ms",
        report.event,
        report.action,
        report.matched(),
        report.fired_count(),
        report.failures.len(),
        report.elapsed().num_milliseconds()
    );
    for location in &report.includes {
        println!("  included {location}");
    }
    for fired in &report.fired {
        println!("  fired    {} ({})", fired.rule, fired.location);
    }
    if let Some(planned) = planned {
        for call in planned {
            println!("  would    {call}");
        }
    }

    if !report.is_success() {
        for failure in &report.failures {
            eprintln!("  failed   {}: {}", failure.origin, failure.error);
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Build the tracker and configuration, then execute. Returns the skipped
/// writes when running dry.
pub(crate) async fn execute(
    args: &RunArgs,
    config: &AppConfig,
) -> Result<(ExecutionReport, Option<Vec<PlannedCall>>), Box<dyn std::error::Error>> {
    let context = load_context(&args.event, &args.payload, args.repo.as_deref(), config)?;

    let base: Arc<dyn IssueTracker> = match &args.content_dir {
        Some(dir) => Arc::new(MemoryTracker::from_dir(dir)),
        None => {
            if !config.has_token() {
                warn!("No GitHub token set (set ISSUEWRIGHT_TOKEN or GITHUB_TOKEN)");
            }
            Arc::new(GithubClient::from_config(&config.github)?)
        }
    };
    let dry_run = (args.dry_run || args.content_dir.is_some())
        .then(|| Arc::new(DryRunTracker::new(base.clone())));
    let tracker: Arc<dyn IssueTracker> = match &dry_run {
        Some(dry_run) => dry_run.clone(),
        None => base,
    };

    let mode = if args.concurrent {
        ExecutionMode::Concurrent
    } else {
        config.rules.mode.parse::<ExecutionMode>()?
    };
    let options = EngineOptions {
        mode,
        max_include_depth: config.rules.max_include_depth,
    };

    let configuration = match &args.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read script {}: {e}", path.display()))?;
            Configuration::new(tracker, context).parse(&text)?
        }
        None => {
            let spec = args.remote.as_deref().unwrap_or(&config.rules.script);
            info!(spec, "Fetching rule script");
            Configuration::load(tracker, context, spec).await?
        }
    };

    let report = configuration.with_options(options).execute().await;
    let planned = match dry_run {
        Some(dry_run) => Some(dry_run.planned().await),
        None => None,
    };
    Ok((report, planned))
}

fn load_context(
    event: &str,
    payload: &Path,
    repo: Option<&str>,
    config: &AppConfig,
) -> Result<EventContext, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(payload)
        .map_err(|e| format!("Failed to read payload {}: {e}", payload.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&text)?;

    let default_repo = match repo {
        Some(repo) => Some(repo.parse::<RepoCoord>()?),
        None => config.rules.default_repo(),
    };
    Ok(EventContext::with_default_repo(Event::new(event, payload), default_repo))
}
