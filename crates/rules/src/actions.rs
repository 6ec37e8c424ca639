//! Action Library: what each verb does against the tracker.
//!
//! Every verb performs exactly one tracker call. The issue target is checked
//! before any argument is resolved, so a context without an issue never
//! triggers a content fetch. `label` and `assign` add to the issue's lists;
//! they never remove what is already there.

use crate::model::{Action, ArgExpr};
use crate::resolver::ContentResolver;
use futures::future::try_join_all;
use issuewright_core::{
    ActionError, AddToIssue, CreateComment, EditIssue, EventContext, IssueEdit, IssueList,
    IssueState, IssueTracker, RepoCoord, ResolutionError,
};
use tracing::{debug, info};

/// Perform `action` for the issue the context refers to.
pub async fn perform(
    action: &Action,
    ctx: &EventContext,
    tracker: &dyn IssueTracker,
    resolver: &ContentResolver,
) -> Result<(), ActionError> {
    let (repo, number) = target(ctx)?;
    info!(action = %action.verb(), repo = %repo, number, "Performing action");

    match action {
        Action::Comment { body } => {
            let body = resolve_arg(body, resolver).await?;
            tracker
                .create_comment(CreateComment {
                    owner: repo.owner,
                    repo: repo.repo,
                    number,
                    body,
                })
                .await?;
        }
        Action::Close => edit(tracker, repo, number, IssueEdit::state(IssueState::Closed)).await?,
        Action::Reopen => edit(tracker, repo, number, IssueEdit::state(IssueState::Open)).await?,
        Action::Label { names } => {
            let items = resolve_all(names, resolver).await?;
            add(tracker, repo, number, IssueList::Labels, items).await?;
        }
        Action::Assign { logins } => {
            let items = resolve_all(logins, resolver).await?;
            add(tracker, repo, number, IssueList::Assignees, items).await?;
        }
    }

    Ok(())
}

fn target(ctx: &EventContext) -> Result<(RepoCoord, u64), ActionError> {
    let repo = ctx.repository().cloned().ok_or(ActionError::MissingRepository)?;
    let number = ctx
        .issue_number()
        .ok_or_else(|| ActionError::MissingIssueNumber {
            event: ctx.event().to_string(),
        })?;
    Ok((repo, number))
}

async fn edit(
    tracker: &dyn IssueTracker,
    repo: RepoCoord,
    number: u64,
    change: IssueEdit,
) -> Result<(), ActionError> {
    tracker
        .edit_issue(EditIssue {
            owner: repo.owner,
            repo: repo.repo,
            number,
            edit: change,
        })
        .await?;
    Ok(())
}

async fn add(
    tracker: &dyn IssueTracker,
    repo: RepoCoord,
    number: u64,
    list: IssueList,
    items: Vec<String>,
) -> Result<(), ActionError> {
    tracker
        .add_to_issue(AddToIssue {
            owner: repo.owner,
            repo: repo.repo,
            number,
            list,
            items,
        })
        .await?;
    Ok(())
}

async fn resolve_arg(arg: &ArgExpr, resolver: &ContentResolver) -> Result<String, ResolutionError> {
    match arg {
        ArgExpr::Literal(text) => Ok(text.clone()),
        ArgExpr::Contents { spec, origin } => {
            debug!(spec = %spec, "Resolving contents() argument");
            Ok(resolver.resolve(spec, origin.as_ref()).await?.text)
        }
    }
}

async fn resolve_all(
    args: &[ArgExpr],
    resolver: &ContentResolver,
) -> Result<Vec<String>, ResolutionError> {
    try_join_all(args.iter().map(|arg| resolve_arg(arg, resolver))).await
}
