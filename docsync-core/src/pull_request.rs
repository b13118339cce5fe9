//! Pull request reconciliation: update the documentation PR for a change if it is
//! open, otherwise open exactly one and cross-reference it from the change.

use tracing::{error, info};

use crate::contract::{NewPullRequest, RepoRef, RepositoryGateway};
use crate::error::{remote, PipelineError};
use crate::links::{DocumentationLink, LinkStore};
use crate::matching::{change_reference, locate_documentation_pr, DOC_PR_MARKER};
use crate::state::{BranchInfo, PullRequestOutcome};

/// Title, body and labels for the documentation PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub title: String,
    pub body: String,
    /// Explicit base branch; the repository default when `None`.
    pub base: Option<String>,
    /// Replaces the full label set when non-empty.
    pub labels: Vec<String>,
}

impl PullRequestDraft {
    /// Make sure the next run's search recognises the PR: the title starts with the
    /// canonical marker and the body references the originating change.
    pub fn normalized(mut self, change_id: Option<u64>) -> Self {
        if !self.title.starts_with(DOC_PR_MARKER) {
            self.title = format!("{DOC_PR_MARKER}: {}", self.title);
        }
        if let Some(id) = change_id {
            let reference = change_reference(id);
            if !self.body.contains(&reference) {
                self.body = format!("{}\n\nDocuments changes from {reference}.", self.body.trim_end());
            }
        }
        self
    }
}

/// Default PR title for a change.
pub fn default_title(change_title: &str) -> String {
    format!("{DOC_PR_MARKER}: {change_title}")
}

/// Default PR body listing the documentation files written in this run.
pub fn default_body(change_id: Option<u64>, written: &[String]) -> String {
    let mut body = String::from("Automated documentation update.\n");
    if let Some(id) = change_id {
        body.push_str(&format!("\nDocuments changes from {}.\n", change_reference(id)));
    }
    if !written.is_empty() {
        body.push_str("\nUpdated files:\n");
        for path in written {
            body.push_str(&format!("- `{path}`\n"));
        }
    }
    body
}

/// Comment posted on the originating change once its documentation PR exists.
pub fn cross_reference_comment(pr_number: u64) -> String {
    format!("📚 Documentation for this change is tracked in #{pr_number}.")
}

/// Ensure exactly one documentation PR exists for the change.
pub async fn reconcile_pull_request<G>(
    gateway: &G,
    links: Option<&dyn LinkStore>,
    repo: &RepoRef,
    branch: &BranchInfo,
    change_id: Option<u64>,
    draft: PullRequestDraft,
) -> Result<PullRequestOutcome, PipelineError>
where
    G: RepositoryGateway + ?Sized,
{
    let draft = draft.normalized(change_id);
    info!(repo = %repo, branch = %branch.name, ?change_id, "[PR] Reconciling documentation pull request");

    let existing = match change_id {
        Some(id) => locate_documentation_pr(gateway, links, repo, id).await?,
        None => None,
    };

    if let Some(pr) = existing {
        gateway
            .update_pull_request(repo, pr.number, &draft.title, &draft.body)
            .await
            .map_err(|e| {
                error!(pr = pr.number, error = %e, "[PR][ERROR] Failed to update pull request");
                remote("update_pull_request")(e)
            })?;
        if !draft.labels.is_empty() {
            gateway
                .set_labels(repo, pr.number, &draft.labels)
                .await
                .map_err(remote("set_labels"))?;
        }
        info!(pr = pr.number, "[PR] Updated existing documentation pull request");
        record(links, change_id, branch, pr.number)?;
        return Ok(PullRequestOutcome {
            number: pr.number,
            created: false,
        });
    }

    let base = match draft.base.clone() {
        Some(base) => base,
        None => gateway
            .get_default_branch(repo)
            .await
            .map_err(remote("get_default_branch"))?,
    };

    let number = gateway
        .create_pull_request(
            repo,
            NewPullRequest {
                title: draft.title.clone(),
                body: draft.body.clone(),
                head: branch.name.clone(),
                base: base.clone(),
            },
        )
        .await
        .map_err(|e| {
            error!(head = %branch.name, base = %base, error = %e, "[PR][ERROR] Failed to create pull request");
            remote("create_pull_request")(e)
        })?;
    info!(pr = number, head = %branch.name, base = %base, "[PR] Created documentation pull request");

    if !draft.labels.is_empty() {
        gateway
            .set_labels(repo, number, &draft.labels)
            .await
            .map_err(remote("set_labels"))?;
    }

    if let Some(id) = change_id {
        gateway
            .add_comment(repo, id, &cross_reference_comment(number))
            .await
            .map_err(remote("add_comment"))?;
        info!(change_id = id, pr = number, "[PR] Cross-referenced documentation PR on originating change");
    }

    record(links, change_id, branch, number)?;
    Ok(PullRequestOutcome {
        number,
        created: true,
    })
}

fn record(
    links: Option<&dyn LinkStore>,
    change_id: Option<u64>,
    branch: &BranchInfo,
    number: u64,
) -> Result<(), PipelineError> {
    if let (Some(store), Some(id)) = (links, change_id) {
        store.put(
            id,
            DocumentationLink {
                branch: branch.name.clone(),
                pull_request: Some(number),
            },
        )?;
    }
    Ok(())
}
