//! Recognising this system's documentation pull requests.
//!
//! Branch reconciliation, PR reconciliation and discovery all locate the open
//! documentation PR through [`locate_documentation_pr`], so the three never disagree
//! about whether one exists.

use tracing::{debug, info, warn};

use crate::contract::{PullRequestSummary, RepoRef, RepositoryGateway};
use crate::error::{remote, PipelineError};
use crate::links::LinkStore;

/// Title prefix of every documentation PR opened by docsync.
pub const DOC_PR_MARKER: &str = "📚 Documentation update";

/// Literal string a documentation PR body carries to point at its originating change.
pub fn change_reference(change_id: u64) -> String {
    format!("#{change_id}")
}

/// Title starts with [`DOC_PR_MARKER`] and the body contains `#<change_id>`.
/// Substring test, not a parse.
pub fn is_documentation_pr(pr: &PullRequestSummary, change_id: u64) -> bool {
    pr.title.starts_with(DOC_PR_MARKER)
        && pr
            .body
            .as_deref()
            .is_some_and(|body| body.contains(&change_reference(change_id)))
}

/// The matching PR with the lowest number, so repeated lookups pick the same one.
pub fn find_documentation_pr(
    prs: &[PullRequestSummary],
    change_id: u64,
) -> Option<&PullRequestSummary> {
    prs.iter()
        .filter(|pr| is_documentation_pr(pr, change_id))
        .min_by_key(|pr| pr.number)
}

/// Find the open documentation PR for `change_id`, re-deriving the answer from the
/// remote on every call.
///
/// A stored link is honoured first when its PR is still open; otherwise the
/// title/body heuristic decides.
pub async fn locate_documentation_pr<G>(
    gateway: &G,
    links: Option<&dyn LinkStore>,
    repo: &RepoRef,
    change_id: u64,
) -> Result<Option<PullRequestSummary>, PipelineError>
where
    G: RepositoryGateway + ?Sized,
{
    let open = gateway
        .list_open_pull_requests(repo)
        .await
        .map_err(remote("list_open_pull_requests"))?;
    debug!(repo = %repo, open = open.len(), change_id, "Listed open pull requests");

    if let Some(store) = links {
        if let Some(number) = store.get(change_id)?.and_then(|link| link.pull_request) {
            match open.iter().find(|pr| pr.number == number) {
                Some(pr) => {
                    info!(change_id, pr = number, "Documentation PR resolved from stored link");
                    return Ok(Some(pr.clone()));
                }
                None => warn!(
                    change_id,
                    pr = number,
                    "Stored documentation PR is no longer open, falling back to title/body match"
                ),
            }
        }
    }

    Ok(find_documentation_pr(&open, change_id).cloned())
}
