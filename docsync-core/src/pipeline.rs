//! The fixed documentation plan, driven through an [`Orchestrator`].
//!
//! One run for one originating change:
//!   1. `record_change`: changed files given or listed from the platform
//!   2. `discover_documentation`: stable docs, navigation and the open PR's draft
//!   3. stop here with an empty [`PipelineOutcome`] when nothing maps to a doc page
//!   4. `reconcile_branch`: the one documentation branch for this change
//!   5. `generate_content` + `commit_content` per target page, in path order
//!   6. the same for the navigation file, when enabled and present
//!   7. `reconcile_pull_request`
//!
//! Any failure aborts the remainder of the run and is returned as-is. Writes already
//! made stay on the branch; a rerun reconciles onto the same branch and PR.

use std::sync::Arc;

use tracing::{error, info};

use crate::action::ActionContext;
use crate::actions::{
    CommitContent, CommitContentParams, DiscoverDocumentation, GenerateContent,
    GenerateContentParams, OriginatingChange, ReconcileBranch, ReconcilePullRequest,
    ReconcilePullRequestParams, RecordChange, RecordChangeParams,
};
use crate::config::PipelineConfig;
use crate::contract::{DocKind, FileChange};
use crate::discovery::documentation_targets;
use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;

/// What a run left behind on the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub branch: Option<String>,
    pub pull_request_number: Option<u64>,
    /// Created or updated in this run, in commit order.
    pub files_written: Vec<String>,
}

/// Reconcile documentation for `change` onto its documentation branch and PR.
pub async fn run_reconciliation_pipeline(
    ctx: ActionContext,
    change: OriginatingChange,
    changed_files: Option<Vec<FileChange>>,
    config: Arc<PipelineConfig>,
) -> Result<PipelineOutcome, PipelineError> {
    info!(repo = %ctx.repo, change = ?change.number, title = %change.title, "[PIPELINE] Starting documentation run");
    config.trace_loaded();

    let mut orchestrator = Orchestrator::new(ctx, Arc::clone(&config))?;
    let result = drive(&mut orchestrator, change, changed_files, &config).await;
    match &result {
        Ok(outcome) => info!(
            branch = ?outcome.branch,
            pull_request = ?outcome.pull_request_number,
            files = outcome.files_written.len(),
            "[PIPELINE] Documentation run finished"
        ),
        Err(e) => error!(error = %e, "[PIPELINE][ERROR] Documentation run failed"),
    }
    result
}

async fn drive(
    orchestrator: &mut Orchestrator,
    change: OriginatingChange,
    changed_files: Option<Vec<FileChange>>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, PipelineError> {
    orchestrator
        .execute(&RecordChange(RecordChangeParams {
            change,
            files: changed_files,
        }))
        .await?;
    orchestrator.execute(&DiscoverDocumentation).await?;

    let targets = match &orchestrator.state().commit_info {
        Some(commit) => documentation_targets(commit, &config.paths),
        None => Default::default(),
    };
    if targets.is_empty() {
        info!("[PIPELINE] No changed file maps to a documentation page, nothing to do");
        return Ok(PipelineOutcome::default());
    }
    info!(targets = ?targets, "[PIPELINE] Documentation targets resolved");

    orchestrator.execute(&ReconcileBranch).await?;

    for target in targets {
        generate_and_commit(orchestrator, target, DocKind::Doc).await?;
    }

    let navigation_present = orchestrator
        .state()
        .doc_info
        .as_ref()
        .and_then(|info| info.file(&config.navigation.path))
        .is_some_and(|f| f.content.is_some());
    if config.navigation.update && navigation_present {
        generate_and_commit(orchestrator, config.navigation.path.clone(), DocKind::Navigation)
            .await?;
    }

    orchestrator
        .execute(&ReconcilePullRequest(ReconcilePullRequestParams::default()))
        .await?;

    let state = orchestrator.state();
    Ok(PipelineOutcome {
        branch: state.branch_info.as_ref().map(|b| b.name.clone()),
        pull_request_number: state.pull_request.map(|pr| pr.number),
        files_written: state.written_paths(),
    })
}

async fn generate_and_commit(
    orchestrator: &mut Orchestrator,
    target_path: String,
    kind: DocKind,
) -> Result<(), PipelineError> {
    let generate = GenerateContent(GenerateContentParams {
        target_path,
        kind,
        template_paths: Vec::new(),
    });
    orchestrator.execute(&generate).await?;
    orchestrator
        .execute(&CommitContent(CommitContentParams::default()))
        .await
}
