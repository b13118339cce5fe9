//! Branch reconciliation: one documentation branch per originating change.
//!
//! Resolution order for a change id:
//!   1. head branch of the open documentation PR (see [`crate::matching`]), which
//!      honours a stored link whose PR is still open
//!   2. stored link whose branch still exists, when no documentation PR is open
//!   3. the deterministic `docs/update-pr-<id>` branch, reused if a previous run
//!      created it but never opened a PR, otherwise created from the default branch tip
//!
//! Without a change id a time-based branch is always created.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::contract::{RepoRef, RepositoryGateway};
use crate::error::{remote, PipelineError};
use crate::links::{DocumentationLink, LinkStore};
use crate::matching::locate_documentation_pr;
use crate::state::BranchInfo;

/// Prefix of every branch docsync creates.
pub const BRANCH_PREFIX: &str = "docs/";

/// Replace characters that are not allowed (or not wanted) inside a single ref
/// segment with `-`.
pub fn sanitize_ref_segment(segment: &str) -> String {
    let replaced: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '~' | '^' | '?' | '*' | '[' | '@' | '{' | '}' => '-',
            c if c.is_whitespace() || c.is_control() => '-',
            c => c,
        })
        .collect();
    let mut sanitized = replaced.replace("..", "-");
    while sanitized.ends_with('.') || sanitized.ends_with(".lock") {
        sanitized = sanitized
            .trim_end_matches(".lock")
            .trim_end_matches('.')
            .to_string();
    }
    sanitized.trim_start_matches('.').to_string()
}

/// Deterministic name for a known change, time-based otherwise.
pub fn derive_branch_name(change_id: Option<u64>, now: DateTime<Utc>) -> String {
    let segment = match change_id {
        Some(id) => format!("update-pr-{id}"),
        None => format!("update-{}", now.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
    };
    format!("{BRANCH_PREFIX}{}", sanitize_ref_segment(&segment))
}

/// Produce exactly one branch to write documentation into.
pub async fn reconcile_branch<G>(
    gateway: &G,
    links: Option<&dyn LinkStore>,
    repo: &RepoRef,
    change_id: Option<u64>,
) -> Result<BranchInfo, PipelineError>
where
    G: RepositoryGateway + ?Sized,
{
    info!(repo = %repo, ?change_id, "[BRANCH] Reconciling documentation branch");

    if let Some(id) = change_id {
        if let Some(branch) = reuse_existing(gateway, links, repo, id).await? {
            return Ok(branch);
        }
    }

    let default_branch = gateway
        .get_default_branch(repo)
        .await
        .map_err(|e| {
            error!(error = %e, "[BRANCH][ERROR] Failed to read default branch");
            remote("get_default_branch")(e)
        })?;
    let name = derive_branch_name(change_id, Utc::now());

    if change_id.is_some() {
        let existing_tip = gateway
            .get_branch_tip(repo, &name)
            .await
            .map_err(remote("get_branch_tip"))?;
        if let Some(sha) = existing_tip {
            warn!(branch = %name, "[BRANCH] Branch exists without a documentation PR, reusing it");
            let branch = BranchInfo {
                name,
                sha,
                exists: true,
            };
            remember(links, change_id, &branch)?;
            return Ok(branch);
        }
    }

    let tip = gateway
        .get_branch_tip(repo, &default_branch)
        .await
        .map_err(remote("get_branch_tip"))?
        .ok_or_else(|| PipelineError::RemoteOperationFailed {
            operation: "get_branch_tip",
            message: format!("default branch '{default_branch}' has no tip"),
        })?;

    gateway
        .create_branch(repo, &name, &tip)
        .await
        .map_err(|e| {
            error!(branch = %name, error = %e, "[BRANCH][ERROR] Failed to create branch");
            remote("create_branch")(e)
        })?;
    info!(branch = %name, from = %default_branch, sha = %tip, "[BRANCH] Created documentation branch");

    let branch = BranchInfo {
        name,
        sha: tip,
        exists: true,
    };
    remember(links, change_id, &branch)?;
    Ok(branch)
}

async fn reuse_existing<G>(
    gateway: &G,
    links: Option<&dyn LinkStore>,
    repo: &RepoRef,
    change_id: u64,
) -> Result<Option<BranchInfo>, PipelineError>
where
    G: RepositoryGateway + ?Sized,
{
    // The open PR decides first so this agrees with PR reconciliation.
    if let Some(pr) = locate_documentation_pr(gateway, links, repo, change_id).await? {
        let sha = gateway
            .get_branch_tip(repo, &pr.head_ref)
            .await
            .map_err(remote("get_branch_tip"))?
            .ok_or_else(|| PipelineError::RemoteOperationFailed {
                operation: "get_branch_tip",
                message: format!("head branch '{}' of PR #{} not found", pr.head_ref, pr.number),
            })?;
        info!(branch = %pr.head_ref, pr = pr.number, "[BRANCH] Reusing branch of existing documentation PR");

        let branch = BranchInfo {
            name: pr.head_ref,
            sha,
            exists: true,
        };
        if let Some(store) = links {
            store.put(
                change_id,
                DocumentationLink {
                    branch: branch.name.clone(),
                    pull_request: Some(pr.number),
                },
            )?;
        }
        return Ok(Some(branch));
    }

    let Some(link) = links.map(|store| store.get(change_id)).transpose()?.flatten() else {
        return Ok(None);
    };
    let tip = gateway
        .get_branch_tip(repo, &link.branch)
        .await
        .map_err(remote("get_branch_tip"))?;
    match tip {
        Some(sha) => {
            info!(branch = %link.branch, change_id, "[BRANCH] No open documentation PR, reusing branch from stored link");
            if let Some(store) = links {
                store.put(
                    change_id,
                    DocumentationLink {
                        branch: link.branch.clone(),
                        pull_request: None,
                    },
                )?;
            }
            Ok(Some(BranchInfo {
                name: link.branch,
                sha,
                exists: true,
            }))
        }
        None => {
            warn!(branch = %link.branch, change_id, "[BRANCH] Stored branch no longer exists");
            Ok(None)
        }
    }
}

fn remember(
    links: Option<&dyn LinkStore>,
    change_id: Option<u64>,
    branch: &BranchInfo,
) -> Result<(), PipelineError> {
    if let (Some(store), Some(id)) = (links, change_id) {
        let pull_request = store.get(id)?.and_then(|l| l.pull_request);
        store.put(
            id,
            DocumentationLink {
                branch: branch.name.clone(),
                pull_request,
            },
        )?;
    }
    Ok(())
}
