//! Pipeline state and its merge semantics.
//!
//! [`PipelineState`] is owned by the orchestrator for one run. Actions only ever see
//! `&PipelineState` and return a [`StateDelta`]; [`PipelineState::merge`] folds the
//! delta into a new state value. A field goes from absent to present and is then
//! either set-once (`commit_info`, the branch name in `branch_info`) or replaced by
//! the newest value (everything else).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::contract::{DocKind, FileChange};
use crate::error::PipelineError;

/// The originating change that triggered the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Pull request / change number on the platform, when known.
    pub number: Option<u64>,
    pub title: String,
    pub description: String,
    pub base_branch: String,
    pub head_branch: String,
    pub files: Vec<FileChange>,
}

/// A known documentation file and its content on the stable branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocFile {
    pub path: String,
    /// `None` when the file does not exist yet or could not be read.
    pub content: Option<String>,
    pub kind: DocKind,
    pub last_modified: Option<String>,
}

/// A file already drafted in the open documentation PR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrFile {
    pub path: String,
    pub content: String,
}

/// Snapshot of the open documentation PR for this change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingPr {
    pub number: u64,
    pub branch: String,
    pub files: Vec<PrFile>,
}

impl ExistingPr {
    pub fn draft_for(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfo {
    /// Sorted by path.
    pub files: Vec<DocFile>,
    pub existing_pr: Option<ExistingPr>,
}

impl DocInfo {
    pub fn file(&self, path: &str) -> Option<&DocFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Content a generator should start from: the open PR's draft wins over the
    /// merged documentation tree.
    pub fn prior_content(&self, path: &str) -> Option<&str> {
        self.existing_pr
            .as_ref()
            .and_then(|pr| pr.draft_for(path))
            .or_else(|| self.file(path).and_then(|f| f.content.as_deref()))
    }
}

/// The single canonical documentation branch for this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub sha: String,
    pub exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Create,
    Update,
}

/// The most recently generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub path: String,
    pub kind: DocKind,
    pub content: String,
    pub update_type: UpdateType,
}

/// A file committed onto the documentation branch in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub path: String,
    pub branch: String,
    pub update_type: UpdateType,
}

/// Result of pull request reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestOutcome {
    pub number: u64,
    /// `false` when an existing PR was updated in place.
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineState {
    pub commit_info: Option<CommitInfo>,
    pub doc_info: Option<DocInfo>,
    pub branch_info: Option<BranchInfo>,
    pub generated_content: Option<GeneratedContent>,
    pub written_files: Option<Vec<WrittenFile>>,
    pub pull_request: Option<PullRequestOutcome>,
    pub config: Arc<PipelineConfig>,
}

/// What an action contributes to the state. Absent fields leave the state untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    pub commit_info: Option<CommitInfo>,
    pub doc_info: Option<DocInfo>,
    pub branch_info: Option<BranchInfo>,
    pub generated_content: Option<GeneratedContent>,
    pub written_files: Option<Vec<WrittenFile>>,
    pub pull_request: Option<PullRequestOutcome>,
}

impl PipelineState {
    /// Empty state for a new run.
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self {
            commit_info: None,
            doc_info: None,
            branch_info: None,
            generated_content: None,
            written_files: None,
            pull_request: None,
            config,
        }
    }

    /// Fold `delta` into a new state value.
    ///
    /// Fails with [`PipelineError::StateConflict`] when the delta would replace the
    /// commit info with a different value, or switch the run to a different branch.
    pub fn merge(self, delta: StateDelta) -> Result<Self, PipelineError> {
        if let (Some(current), Some(incoming)) = (&self.commit_info, &delta.commit_info) {
            if current != incoming {
                return Err(PipelineError::StateConflict {
                    field: "commit_info",
                });
            }
        }
        if let (Some(current), Some(incoming)) = (&self.branch_info, &delta.branch_info) {
            if current.name != incoming.name {
                return Err(PipelineError::StateConflict {
                    field: "branch_info",
                });
            }
        }

        Ok(Self {
            commit_info: delta.commit_info.or(self.commit_info),
            doc_info: delta.doc_info.or(self.doc_info),
            branch_info: delta.branch_info.or(self.branch_info),
            generated_content: delta.generated_content.or(self.generated_content),
            written_files: delta.written_files.or(self.written_files),
            pull_request: delta.pull_request.or(self.pull_request),
            config: self.config,
        })
    }

    /// Id of the originating change, if the run has one.
    pub fn change_id(&self) -> Option<u64> {
        self.commit_info.as_ref().and_then(|c| c.number)
    }

    pub fn written_paths(&self) -> Vec<String> {
        self.written_files
            .iter()
            .flatten()
            .map(|f| f.path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ChangeType;

    fn commit(title: &str) -> CommitInfo {
        CommitInfo {
            number: Some(42),
            title: title.to_string(),
            description: String::new(),
            base_branch: "main".to_string(),
            head_branch: "feature".to_string(),
            files: vec![FileChange {
                path: "src/llm/openai.ts".to_string(),
                diff: None,
                change_type: ChangeType::Modified,
            }],
        }
    }

    fn branch(name: &str, sha: &str) -> BranchInfo {
        BranchInfo {
            name: name.to_string(),
            sha: sha.to_string(),
            exists: true,
        }
    }

    #[test]
    fn merge_fills_absent_fields_and_keeps_others() {
        let state = PipelineState::new(Arc::new(PipelineConfig::default()));
        let state = state
            .merge(StateDelta {
                commit_info: Some(commit("Add OpenAI")),
                ..Default::default()
            })
            .expect("merge commit");
        let state = state
            .merge(StateDelta {
                branch_info: Some(branch("docs/update-pr-42", "abc")),
                ..Default::default()
            })
            .expect("merge branch");

        assert_eq!(state.change_id(), Some(42));
        assert_eq!(state.branch_info.as_ref().map(|b| b.sha.as_str()), Some("abc"));
        assert!(state.doc_info.is_none());
    }

    #[test]
    fn merge_overwrites_generated_content_with_newest() {
        let state = PipelineState::new(Arc::new(PipelineConfig::default()));
        let first = GeneratedContent {
            path: "docs/a.mdx".to_string(),
            kind: DocKind::Doc,
            content: "one".to_string(),
            update_type: UpdateType::Create,
        };
        let second = GeneratedContent {
            path: "docs/b.mdx".to_string(),
            ..first.clone()
        };
        let state = state
            .merge(StateDelta {
                generated_content: Some(first),
                ..Default::default()
            })
            .and_then(|s| {
                s.merge(StateDelta {
                    generated_content: Some(second),
                    ..Default::default()
                })
            })
            .expect("merge");

        assert_eq!(state.generated_content.unwrap().path, "docs/b.mdx");
    }

    #[test]
    fn merge_rejects_a_second_commit_info() {
        let state = PipelineState::new(Arc::new(PipelineConfig::default()))
            .merge(StateDelta {
                commit_info: Some(commit("first")),
                ..Default::default()
            })
            .expect("merge");

        let err = state
            .merge(StateDelta {
                commit_info: Some(commit("second")),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StateConflict {
                field: "commit_info"
            }
        ));
    }

    #[test]
    fn merge_allows_same_branch_with_new_tip_but_not_another_branch() {
        let state = PipelineState::new(Arc::new(PipelineConfig::default()))
            .merge(StateDelta {
                branch_info: Some(branch("docs/update-pr-42", "abc")),
                ..Default::default()
            })
            .expect("merge");

        let state = state
            .merge(StateDelta {
                branch_info: Some(branch("docs/update-pr-42", "def")),
                ..Default::default()
            })
            .expect("same branch is fine");
        assert_eq!(state.branch_info.as_ref().unwrap().sha, "def");

        let err = state
            .merge(StateDelta {
                branch_info: Some(branch("docs/other", "abc")),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StateConflict {
                field: "branch_info"
            }
        ));
    }

    #[test]
    fn prior_content_prefers_open_pr_draft() {
        let info = DocInfo {
            files: vec![DocFile {
                path: "docs/llm/openai.mdx".to_string(),
                content: Some("stable".to_string()),
                kind: DocKind::Doc,
                last_modified: None,
            }],
            existing_pr: Some(ExistingPr {
                number: 7,
                branch: "docs/update-pr-42".to_string(),
                files: vec![PrFile {
                    path: "docs/llm/openai.mdx".to_string(),
                    content: "draft".to_string(),
                }],
            }),
        };

        assert_eq!(info.prior_content("docs/llm/openai.mdx"), Some("draft"));
        assert_eq!(info.prior_content("docs/missing.mdx"), None);
    }
}
