//! Integration tests for rule scripts.
//!
//! These run whole scripts against recorded webhook payloads and check the
//! exact calls made to the issue tracker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use issuewright_core::{
    AddToIssue, CreateComment, EditIssue, Event, EventContext, GetContent, IssueList, IssueState,
    IssueTracker, RepoContent, TrackerError,
};
use issuewright_rules::{Configuration, ExecutionMode, EngineOptions, configure};

const COMMENT_CREATED: &str = include_str!("fixtures/webhook/issue_comment.created.json");
const ISSUES_LABELED: &str = include_str!("fixtures/webhook/issues.labeled.json");
const TRIAGE_CONTENT: &str = include_str!("fixtures/content/triage.json");

// ── Mock Tracker ─────────────────────────────────────────────────────────

/// A tracker that serves scripted file contents and records every call.
#[derive(Default)]
struct ScriptedTracker {
    files: Mutex<HashMap<(String, String, String), RepoContent>>,
    comments: Mutex<Vec<CreateComment>>,
    edits: Mutex<Vec<EditIssue>>,
    additions: Mutex<Vec<AddToIssue>>,
    fetches: Mutex<Vec<GetContent>>,
}

impl ScriptedTracker {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn serve(&self, owner: &str, repo: &str, path: &str, content: RepoContent) {
        self.files
            .lock()
            .unwrap()
            .insert((owner.into(), repo.into(), path.into()), content);
    }

    fn serve_text(&self, owner: &str, repo: &str, path: &str, text: &str) {
        self.serve(owner, repo, path, RepoContent::from_text(text));
    }

    fn comments(&self) -> Vec<CreateComment> {
        self.comments.lock().unwrap().clone()
    }

    fn edits(&self) -> Vec<EditIssue> {
        self.edits.lock().unwrap().clone()
    }

    fn additions(&self) -> Vec<AddToIssue> {
        self.additions.lock().unwrap().clone()
    }

    fn fetches(&self) -> Vec<GetContent> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IssueTracker for ScriptedTracker {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_comment(&self, request: CreateComment) -> Result<(), TrackerError> {
        self.comments.lock().unwrap().push(request);
        Ok(())
    }

    async fn edit_issue(&self, request: EditIssue) -> Result<(), TrackerError> {
        self.edits.lock().unwrap().push(request);
        Ok(())
    }

    async fn add_to_issue(&self, request: AddToIssue) -> Result<(), TrackerError> {
        self.additions.lock().unwrap().push(request);
        Ok(())
    }

    async fn get_content(&self, request: GetContent) -> Result<RepoContent, TrackerError> {
        self.fetches.lock().unwrap().push(request.clone());
        let key = (request.owner, request.repo, request.path);
        self.files
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(key.2.clone()))
    }
}

fn context(fixture: &str) -> EventContext {
    let payload = serde_json::from_str(fixture).unwrap();
    EventContext::new(Event::new("issues", payload))
}

fn fetch(owner: &str, repo: &str, path: &str) -> GetContent {
    GetContent {
        owner: owner.into(),
        repo: repo.into(),
        path: path.into(),
    }
}

// ── Reply to new issue ───────────────────────────────────────────────────

#[tokio::test]
async fn posts_a_comment() {
    let tracker = ScriptedTracker::new();
    let config = configure(
        tracker.clone(),
        context(COMMENT_CREATED),
        r#"on("issues").comment("Hello World!")"#,
    )
    .unwrap();

    let report = config.execute().await;

    assert!(report.is_success());
    assert_eq!(
        tracker.comments(),
        vec![CreateComment {
            owner: "bkeepers-inc".into(),
            repo: "test".into(),
            number: 2,
            body: "Hello World!".into(),
        }]
    );
}

#[tokio::test]
async fn different_action_does_not_perform() {
    let tracker = ScriptedTracker::new();
    let config = configure(
        tracker.clone(),
        context(COMMENT_CREATED),
        r#"on("issues.labeled").comment("Hello World!")"#,
    )
    .unwrap();

    let report = config.execute().await;

    assert_eq!(report.matched(), 0);
    assert!(tracker.comments().is_empty());
}

// ── Filter ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn filter_match_calls_action() {
    let tracker = ScriptedTracker::new();
    let config = configure(
        tracker.clone(),
        context(ISSUES_LABELED),
        r#"on("issues.labeled").filter((e) => e.payload.label.name == "bug").close()"#,
    )
    .unwrap();

    config.execute().await;

    let edits = tracker.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].number, 5);
    assert_eq!(edits[0].edit.state, Some(IssueState::Closed));
}

#[tokio::test]
async fn filter_mismatch_skips_action() {
    let tracker = ScriptedTracker::new();
    let config = configure(
        tracker.clone(),
        context(ISSUES_LABELED),
        r#"on("issues.labeled").filter((e) => e.payload.label.name == "foobar").close()"#,
    )
    .unwrap();

    let report = config.execute().await;

    assert_eq!(report.matched(), 1);
    assert_eq!(report.fired_count(), 0);
    assert!(tracker.edits().is_empty());
}

#[tokio::test]
async fn explicit_issue_overrides_payload() {
    let tracker = ScriptedTracker::new();
    let payload = serde_json::from_str(ISSUES_LABELED).unwrap();
    let event = Event {
        event: "issues".into(),
        payload,
        issue: Some(serde_json::json!({"number": 99})),
    };
    let config = configure(tracker.clone(), EventContext::new(event), r#"on("issues").reopen()"#)
        .unwrap();

    config.execute().await;

    assert_eq!(tracker.edits()[0].number, 99);
    assert_eq!(tracker.edits()[0].edit.state, Some(IssueState::Open));
}

// ── Include ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn includes_a_file_in_the_local_repository() {
    let tracker = ScriptedTracker::new();
    let content: RepoContent = serde_json::from_str(TRIAGE_CONTENT).unwrap();
    tracker.serve("bkeepers-inc", "test", ".github/triage.js", content);

    let config = configure(
        tracker.clone(),
        context(COMMENT_CREATED),
        r#"include(".github/triage.js");"#,
    )
    .unwrap();

    // Nothing is fetched until the script runs.
    assert!(tracker.fetches().is_empty());

    let report = config.execute().await;

    assert_eq!(tracker.fetches(), vec![fetch("bkeepers-inc", "test", ".github/triage.js")]);
    assert_eq!(report.includes, vec!["bkeepers-inc/test:.github/triage.js"]);
    assert_eq!(tracker.comments().len(), 1);
    assert_eq!(tracker.comments()[0].body, "Hello!");
}

#[tokio::test]
async fn includes_files_relative_to_included_repository() {
    let tracker = ScriptedTracker::new();
    tracker.serve_text("other", "repo", "script-a.js", r#"include("script-b.js")"#);
    tracker.serve("other", "repo", "script-b.js", RepoContent::default());

    let config = configure(
        tracker.clone(),
        context(COMMENT_CREATED),
        r#"include("other/repo:script-a.js");"#,
    )
    .unwrap();

    let report = config.execute().await;

    assert!(report.is_success());
    assert_eq!(
        tracker.fetches(),
        vec![
            fetch("other", "repo", "script-a.js"),
            fetch("other", "repo", "script-b.js"),
        ]
    );
}

#[tokio::test]
async fn failing_include_does_not_block_other_rules() {
    let tracker = ScriptedTracker::new();
    let config = configure(
        tracker.clone(),
        context(COMMENT_CREATED),
        r#"
        include("missing/repo:rules.js");
        on("issues").comment("still here");
        "#,
    )
    .unwrap();

    let report = config.execute().await;

    assert_eq!(report.fired_count(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(tracker.comments()[0].body, "still here");
    let err = report.into_result().unwrap_err();
    assert!(err.to_string().contains("missing/repo:rules.js"));
}

// ── Contents ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn gets_content_from_repo() {
    let tracker = ScriptedTracker::new();
    tracker.serve_text("bkeepers-inc", "test", ".github/ISSUE_REPLY_TEMPLATE", "file contents");

    let config = configure(
        tracker.clone(),
        context(COMMENT_CREATED),
        r#"
        on("issues").comment(contents(".github/ISSUE_REPLY_TEMPLATE"));
        "#,
    )
    .unwrap();

    config.execute().await;

    assert_eq!(
        tracker.comments(),
        vec![CreateComment {
            owner: "bkeepers-inc".into(),
            repo: "test".into(),
            number: 2,
            body: "file contents".into(),
        }]
    );
}

#[tokio::test]
async fn gets_contents_relative_to_included_repository() {
    let tracker = ScriptedTracker::new();
    tracker.serve_text(
        "other",
        "repo",
        "script-a.js",
        r#"
        on("issues").comment(contents("content.md"));
        "#,
    );
    tracker.serve_text("other", "repo", "content.md", "## Thanks!\n\nWe'll take a look.\n");

    let config = configure(
        tracker.clone(),
        context(COMMENT_CREATED),
        r#"include("other/repo:script-a.js")"#,
    )
    .unwrap();

    config.execute().await;

    assert_eq!(tracker.fetches()[1], fetch("other", "repo", "content.md"));
    assert_eq!(tracker.comments()[0].body, "## Thanks!\n\nWe'll take a look.\n");
    assert_eq!(tracker.comments()[0].repo, "test");
}

// ── Loading and modes ────────────────────────────────────────────────────

#[tokio::test]
async fn load_runs_a_remote_root_script() {
    let tracker = ScriptedTracker::new();
    tracker.serve_text(
        "bkeepers-inc",
        "test",
        ".github/issuewright.js",
        r#"
        on("issues.labeled")
          .filter(e => e.payload.issue.title.toLowerCase().includes("build"))
          .label("ci");
        on("issues.labeled").filter(e => e.payload.label.name === "bug").assign("bkeepers");
        "#,
    );

    let config = Configuration::load(tracker.clone(), context(ISSUES_LABELED), ".github/issuewright.js")
        .await
        .unwrap()
        .with_options(EngineOptions {
            mode: ExecutionMode::Concurrent,
            ..Default::default()
        });

    let report = config.execute().await;

    assert_eq!(report.fired_count(), 2);
    assert!(tracker.edits().is_empty());
    let additions = tracker.additions();
    assert!(additions.iter().any(|a| a.list == IssueList::Labels && a.items == ["ci"]));
    assert!(additions.iter().any(|a| a.list == IssueList::Assignees && a.items == ["bkeepers"]));
}

#[tokio::test]
async fn labeling_keeps_the_triggering_label() {
    let tracker = ScriptedTracker::new();
    configure(
        tracker.clone(),
        context(ISSUES_LABELED),
        r#"on("issues.labeled").label("triaged")"#,
    )
    .unwrap()
    .execute()
    .await;

    // Only an additive call is made; no edit replaces the existing labels.
    assert!(tracker.edits().is_empty());
    assert_eq!(
        tracker.additions(),
        vec![AddToIssue {
            owner: "bkeepers-inc".into(),
            repo: "test".into(),
            number: 5,
            list: IssueList::Labels,
            items: vec!["triaged".into()],
        }]
    );
}
