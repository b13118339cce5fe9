//! The concrete actions of the documentation pipeline and their typed parameters.
//!
//! ```text
//! record_change ─┬─► reconcile_branch ─────────────┐
//!                └─► discover_documentation         │
//!                        └─► generate_content ──────┴─► commit_content ─► reconcile_pull_request
//! ```
//!
//! Parameters are plain structs. External planners send JSON
//! (`{"action": "generate_content", "params": {...}}`), which [`action_from_request`]
//! deserializes into the action's struct; anything malformed is
//! [`PipelineError::InvalidParameters`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::action::{Action, ActionContext, ActionDescriptor, ParamSpec};
use crate::branch::reconcile_branch;
use crate::contract::{DocKind, FileChange, FileWrite, GenerationRequest};
use crate::discovery::{discover_documentation, documentation_target};
use crate::error::{remote, PipelineError};
use crate::pull_request::{default_body, default_title, reconcile_pull_request, PullRequestDraft};
use crate::quality;
use crate::state::{
    CommitInfo, GeneratedContent, PipelineState, StateDelta, UpdateType, WrittenFile,
};
use crate::targeting::select_templates;

pub const RECORD_CHANGE: &str = "record_change";
pub const RECONCILE_BRANCH: &str = "reconcile_branch";
pub const DISCOVER_DOCUMENTATION: &str = "discover_documentation";
pub const GENERATE_CONTENT: &str = "generate_content";
pub const COMMIT_CONTENT: &str = "commit_content";
pub const RECONCILE_PULL_REQUEST: &str = "reconcile_pull_request";

/// Every action the pipeline knows about.
pub fn catalog() -> Vec<&'static ActionDescriptor> {
    vec![
        &RecordChange::DESCRIPTOR,
        &ReconcileBranch::DESCRIPTOR,
        &DiscoverDocumentation::DESCRIPTOR,
        &GenerateContent::DESCRIPTOR,
        &CommitContent::DESCRIPTOR,
        &ReconcilePullRequest::DESCRIPTOR,
    ]
}

/// Build an action from a planner request.
pub fn action_from_request(
    action: &str,
    params: serde_json::Value,
) -> Result<Box<dyn Action>, PipelineError> {
    fn parse<T: serde::de::DeserializeOwned>(
        action: &str,
        params: serde_json::Value,
    ) -> Result<T, PipelineError> {
        let params = if params.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            params
        };
        serde_json::from_value(params).map_err(|e| PipelineError::InvalidParameters {
            action: action.to_string(),
            reason: e.to_string(),
        })
    }

    Ok(match action {
        RECORD_CHANGE => Box::new(RecordChange(parse(action, params)?)),
        RECONCILE_BRANCH => Box::new(ReconcileBranch),
        DISCOVER_DOCUMENTATION => Box::new(DiscoverDocumentation),
        GENERATE_CONTENT => Box::new(GenerateContent(parse(action, params)?)),
        COMMIT_CONTENT => Box::new(CommitContent(parse(action, params)?)),
        RECONCILE_PULL_REQUEST => Box::new(ReconcilePullRequest(parse(action, params)?)),
        other => {
            return Err(PipelineError::InvalidParameters {
                action: other.to_string(),
                reason: "unknown action".to_string(),
            })
        }
    })
}

fn unmet(action: &str, dependency: &str) -> PipelineError {
    PipelineError::DependencyUnmet {
        action: action.to_string(),
        missing: vec![dependency.to_string()],
    }
}

/// The source change documentation is generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginatingChange {
    pub number: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub base_branch: String,
    pub head_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChangeParams {
    pub change: OriginatingChange,
    /// Changed files; fetched from the platform when omitted and the change has a number.
    #[serde(default)]
    pub files: Option<Vec<FileChange>>,
}

/// Populates `commit_info`.
pub struct RecordChange(pub RecordChangeParams);

impl RecordChange {
    pub const DESCRIPTOR: ActionDescriptor = ActionDescriptor {
        id: RECORD_CHANGE,
        depends_on: &[],
        parameters: &[
            ParamSpec {
                name: "change",
                required: true,
                description: "originating change: number?, title, description, base_branch, head_branch",
            },
            ParamSpec {
                name: "files",
                required: false,
                description: "changed files; listed from the platform when omitted",
            },
        ],
    };
}

#[async_trait]
impl Action for RecordChange {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &Self::DESCRIPTOR
    }

    async fn execute(
        &self,
        _state: &PipelineState,
        ctx: &ActionContext,
    ) -> Result<StateDelta, PipelineError> {
        let change = &self.0.change;
        let files = match (&self.0.files, change.number) {
            (Some(files), _) => files.clone(),
            (None, Some(number)) => ctx
                .gateway
                .list_changed_files(&ctx.repo, number)
                .await
                .map_err(remote("list_changed_files"))?,
            (None, None) => {
                return Err(PipelineError::InvalidParameters {
                    action: RECORD_CHANGE.to_string(),
                    reason: "files are required when the change has no number".to_string(),
                })
            }
        };
        info!(change = ?change.number, files = files.len(), "[PIPELINE] Recorded originating change");

        Ok(StateDelta {
            commit_info: Some(CommitInfo {
                number: change.number,
                title: change.title.clone(),
                description: change.description.clone(),
                base_branch: change.base_branch.clone(),
                head_branch: change.head_branch.clone(),
                files,
            }),
            ..Default::default()
        })
    }
}

/// Populates `branch_info` with the single canonical documentation branch.
pub struct ReconcileBranch;

impl ReconcileBranch {
    pub const DESCRIPTOR: ActionDescriptor = ActionDescriptor {
        id: RECONCILE_BRANCH,
        depends_on: &[RECORD_CHANGE],
        parameters: &[],
    };
}

#[async_trait]
impl Action for ReconcileBranch {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &Self::DESCRIPTOR
    }

    async fn execute(
        &self,
        state: &PipelineState,
        ctx: &ActionContext,
    ) -> Result<StateDelta, PipelineError> {
        if state.commit_info.is_none() {
            return Err(unmet(RECONCILE_BRANCH, RECORD_CHANGE));
        }
        let branch =
            reconcile_branch(&*ctx.gateway, ctx.links(), &ctx.repo, state.change_id()).await?;
        Ok(StateDelta {
            branch_info: Some(branch),
            ..Default::default()
        })
    }
}

/// Populates `doc_info`.
pub struct DiscoverDocumentation;

impl DiscoverDocumentation {
    pub const DESCRIPTOR: ActionDescriptor = ActionDescriptor {
        id: DISCOVER_DOCUMENTATION,
        depends_on: &[RECORD_CHANGE],
        parameters: &[],
    };
}

#[async_trait]
impl Action for DiscoverDocumentation {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &Self::DESCRIPTOR
    }

    async fn execute(
        &self,
        state: &PipelineState,
        ctx: &ActionContext,
    ) -> Result<StateDelta, PipelineError> {
        let commit = state
            .commit_info
            .as_ref()
            .ok_or_else(|| unmet(DISCOVER_DOCUMENTATION, RECORD_CHANGE))?;
        let doc_info =
            discover_documentation(&*ctx.gateway, ctx.links(), &ctx.repo, commit, &state.config)
                .await?;
        Ok(StateDelta {
            doc_info: Some(doc_info),
            ..Default::default()
        })
    }
}

fn default_kind() -> DocKind {
    DocKind::Doc
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateContentParams {
    pub target_path: String,
    #[serde(default = "default_kind")]
    pub kind: DocKind,
    /// Documents to imitate; category matching is used when empty or unknown.
    #[serde(default)]
    pub template_paths: Vec<String>,
}

/// Generates one file and stores it in `generated_content`.
pub struct GenerateContent(pub GenerateContentParams);

impl GenerateContent {
    pub const DESCRIPTOR: ActionDescriptor = ActionDescriptor {
        id: GENERATE_CONTENT,
        depends_on: &[DISCOVER_DOCUMENTATION],
        parameters: &[
            ParamSpec {
                name: "target_path",
                required: true,
                description: "documentation file to generate",
            },
            ParamSpec {
                name: "kind",
                required: false,
                description: "\"doc\" (default) or \"navigation\"",
            },
            ParamSpec {
                name: "template_paths",
                required: false,
                description: "documents whose style to follow",
            },
        ],
    };
}

/// Text handed to the generator describing what changed for `target`.
pub fn change_summary(state: &PipelineState, target: &str, kind: DocKind) -> String {
    let mut summary = String::new();
    let Some(commit) = &state.commit_info else {
        return summary;
    };
    summary.push_str(&format!("# {}\n", commit.title));
    if !commit.description.trim().is_empty() {
        summary.push_str(&format!("\n{}\n", commit.description.trim()));
    }

    match kind {
        DocKind::Doc => {
            for file in commit
                .files
                .iter()
                .filter(|f| documentation_target(&f.path, &state.config.paths).as_deref() == Some(target))
            {
                summary.push_str(&format!(
                    "\n## {} ({:?})\n",
                    file.path,
                    file.change_type
                ));
                if let Some(diff) = &file.diff {
                    summary.push_str(&format!("```diff\n{}\n```\n", diff.trim_end()));
                }
            }
        }
        DocKind::Navigation => {
            summary.push_str("\nDocumentation pages in this change:\n");
            let written = state.written_paths();
            if let Some(doc_info) = &state.doc_info {
                for file in doc_info.files.iter().filter(|f| f.kind == DocKind::Doc) {
                    let status = if file.content.is_some() { "updated" } else { "new" };
                    let committed = if written.contains(&file.path) { "" } else { " (not written)" };
                    summary.push_str(&format!("- {} [{status}]{committed}\n", file.path));
                }
            }
        }
    }
    summary
}

#[async_trait]
impl Action for GenerateContent {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &Self::DESCRIPTOR
    }

    async fn execute(
        &self,
        state: &PipelineState,
        ctx: &ActionContext,
    ) -> Result<StateDelta, PipelineError> {
        let params = &self.0;
        if params.target_path.trim().is_empty() {
            return Err(PipelineError::InvalidParameters {
                action: GENERATE_CONTENT.to_string(),
                reason: "target_path must not be empty".to_string(),
            });
        }
        let doc_info = state
            .doc_info
            .as_ref()
            .ok_or_else(|| unmet(GENERATE_CONTENT, DISCOVER_DOCUMENTATION))?;

        let prior = doc_info.prior_content(&params.target_path).map(str::to_string);
        let templates: Vec<String> =
            select_templates(&params.target_path, doc_info, &params.template_paths)
                .into_iter()
                .filter_map(|f| f.content.clone())
                .collect();
        info!(
            path = %params.target_path,
            kind = ?params.kind,
            has_prior = prior.is_some(),
            templates = templates.len(),
            "[GENERATE] Generating content"
        );

        let request = GenerationRequest {
            kind: params.kind,
            target_path: params.target_path.clone(),
            prior_content: prior.clone(),
            change_summary: change_summary(state, &params.target_path, params.kind),
            templates,
            options: state.config.generation.clone(),
        };
        let content = ctx
            .generator
            .generate(request)
            .await
            .map_err(remote("generate"))?;

        if let Err(e) = quality::check(&params.target_path, params.kind, &content, &state.config.quality) {
            warn!(path = %params.target_path, error = %e, "[GENERATE] Generated content rejected");
            return Err(e);
        }

        Ok(StateDelta {
            generated_content: Some(GeneratedContent {
                path: params.target_path.clone(),
                kind: params.kind,
                content,
                update_type: if prior.is_some() {
                    UpdateType::Update
                } else {
                    UpdateType::Create
                },
            }),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitContentParams {
    /// Commit message; derived from the file and change when omitted.
    #[serde(default)]
    pub message: Option<String>,
}

/// Commits `generated_content` onto the documentation branch.
pub struct CommitContent(pub CommitContentParams);

impl CommitContent {
    pub const DESCRIPTOR: ActionDescriptor = ActionDescriptor {
        id: COMMIT_CONTENT,
        depends_on: &[RECONCILE_BRANCH, GENERATE_CONTENT],
        parameters: &[ParamSpec {
            name: "message",
            required: false,
            description: "commit message",
        }],
    };
}

#[async_trait]
impl Action for CommitContent {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &Self::DESCRIPTOR
    }

    async fn execute(
        &self,
        state: &PipelineState,
        ctx: &ActionContext,
    ) -> Result<StateDelta, PipelineError> {
        let branch = state
            .branch_info
            .as_ref()
            .filter(|b| b.exists)
            .ok_or_else(|| unmet(COMMIT_CONTENT, RECONCILE_BRANCH))?;
        let generated = state
            .generated_content
            .as_ref()
            .ok_or_else(|| unmet(COMMIT_CONTENT, GENERATE_CONTENT))?;

        let current = ctx
            .gateway
            .read_file(&ctx.repo, &generated.path, &branch.name)
            .await
            .map_err(remote("read_file"))?;

        let message = self.0.message.clone().unwrap_or_else(|| {
            let verb = if current.is_some() { "update" } else { "add" };
            match state.change_id() {
                Some(id) => format!("docs: {verb} {} (#{id})", generated.path),
                None => format!("docs: {verb} {}", generated.path),
            }
        });

        ctx.gateway
            .write_file(
                &ctx.repo,
                FileWrite {
                    path: generated.path.clone(),
                    content: generated.content.clone(),
                    message,
                    branch: branch.name.clone(),
                    prior_sha: current.map(|f| f.sha),
                },
            )
            .await
            .map_err(remote("write_file"))?;
        info!(path = %generated.path, branch = %branch.name, "[COMMIT] Committed documentation file");

        let mut written: Vec<WrittenFile> = state
            .written_files
            .iter()
            .flatten()
            .filter(|f| f.path != generated.path)
            .cloned()
            .collect();
        written.push(WrittenFile {
            path: generated.path.clone(),
            branch: branch.name.clone(),
            update_type: generated.update_type,
        });

        Ok(StateDelta {
            written_files: Some(written),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePullRequestParams {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Base branch for a new PR; configuration, then the repository default, otherwise.
    #[serde(default)]
    pub base: Option<String>,
    /// Replaces the configured labels when present.
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

/// Updates or creates the documentation PR; populates `pull_request`.
pub struct ReconcilePullRequest(pub ReconcilePullRequestParams);

impl ReconcilePullRequest {
    pub const DESCRIPTOR: ActionDescriptor = ActionDescriptor {
        id: RECONCILE_PULL_REQUEST,
        depends_on: &[COMMIT_CONTENT],
        parameters: &[
            ParamSpec {
                name: "title",
                required: false,
                description: "PR title; the canonical marker is prepended when missing",
            },
            ParamSpec {
                name: "body",
                required: false,
                description: "PR body; a reference to the originating change is appended when missing",
            },
            ParamSpec {
                name: "base",
                required: false,
                description: "base branch for a new PR",
            },
            ParamSpec {
                name: "labels",
                required: false,
                description: "labels replacing the configured set",
            },
        ],
    };
}

#[async_trait]
impl Action for ReconcilePullRequest {
    fn descriptor(&self) -> &'static ActionDescriptor {
        &Self::DESCRIPTOR
    }

    async fn execute(
        &self,
        state: &PipelineState,
        ctx: &ActionContext,
    ) -> Result<StateDelta, PipelineError> {
        let commit = state
            .commit_info
            .as_ref()
            .ok_or_else(|| unmet(RECONCILE_PULL_REQUEST, RECORD_CHANGE))?;
        let branch = state
            .branch_info
            .as_ref()
            .filter(|b| b.exists)
            .ok_or_else(|| unmet(RECONCILE_PULL_REQUEST, RECONCILE_BRANCH))?;
        let written = state.written_paths();
        if written.is_empty() {
            return Err(unmet(RECONCILE_PULL_REQUEST, COMMIT_CONTENT));
        }

        let params = &self.0;
        let draft = PullRequestDraft {
            title: params
                .title
                .clone()
                .unwrap_or_else(|| default_title(&commit.title)),
            body: params
                .body
                .clone()
                .unwrap_or_else(|| default_body(commit.number, &written)),
            base: params
                .base
                .clone()
                .or_else(|| state.config.pull_request.base.clone()),
            labels: params
                .labels
                .clone()
                .unwrap_or_else(|| state.config.pull_request.labels.clone()),
        };

        let outcome = reconcile_pull_request(
            &*ctx.gateway,
            ctx.links(),
            &ctx.repo,
            branch,
            commit.number,
            draft,
        )
        .await?;
        Ok(StateDelta {
            pull_request: Some(outcome),
            ..Default::default()
        })
    }
}
