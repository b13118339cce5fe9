//! # contract: capability interfaces the core depends on
//!
//! The core never talks HTTP itself. Everything it needs from the outside world is
//! expressed through two traits:
//!
//! - [`RepositoryGateway`]: the git-hosting platform (branches, files, pull requests,
//!   labels, comments).
//! - [`ContentGenerator`]: the text-generation service.
//!
//! Both traits are async, `Send + Sync`, and return boxed errors ([`GatewayError`]) so
//! implementors are free to surface whatever upstream error they get. The core maps
//! these into [`crate::error::PipelineError::RemoteOperationFailed`].
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`; with the default `test-export-mocks`
//! feature the generated `MockRepositoryGateway` / `MockContentGenerator` are exported
//! for integration tests in dependent crates.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::config::GenerationOptions;

/// Error type for gateway and generator calls (simple boxed error, as upstream errors vary).
pub type GatewayError = Box<dyn std::error::Error + Send + Sync>;

/// Identifies the target repository on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// How a file was touched by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// One file touched by a pull request or commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    /// Unified diff for the file, when the platform provides one.
    #[serde(default)]
    pub diff: Option<String>,
    pub change_type: ChangeType,
}

/// A file read from the repository at some ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded UTF-8 content.
    pub content: String,
    /// Blob sha, required by the platform to overwrite the file.
    pub sha: String,
    pub last_modified: Option<String>,
}

/// A single-file commit onto a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
    /// Sha of the blob being replaced; `None` when the file is new on the branch.
    pub prior_sha: Option<String>,
}

/// Open pull request as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub head_ref: String,
    pub base_ref: String,
}

/// Request for a new pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

/// Trait for the git-hosting platform. Implemented by the real REST client and by test
/// mocks/fakes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryGateway: Send + Sync {
    /// Name of the repository's default branch.
    async fn get_default_branch(&self, repo: &RepoRef) -> Result<String, GatewayError>;

    /// Tip commit of `branch`, or `None` when the branch does not exist.
    async fn get_branch_tip(
        &self,
        repo: &RepoRef,
        branch: &str,
    ) -> Result<Option<String>, GatewayError>;

    /// Create `refs/heads/<name>` pointing at `from_sha`.
    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<(), GatewayError>;

    /// Read and decode a file at `reference`; `None` when it does not exist there.
    async fn read_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<RemoteFile>, GatewayError>;

    /// Commit a single file onto a branch.
    async fn write_file(&self, repo: &RepoRef, write: FileWrite) -> Result<(), GatewayError>;

    async fn list_open_pull_requests(
        &self,
        repo: &RepoRef,
    ) -> Result<Vec<PullRequestSummary>, GatewayError>;

    /// Open a pull request and return its number.
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: NewPullRequest,
    ) -> Result<u64, GatewayError>;

    async fn update_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        title: &str,
        body: &str,
    ) -> Result<(), GatewayError>;

    /// Replace the full label set of an issue or pull request.
    async fn set_labels(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        labels: &[String],
    ) -> Result<(), GatewayError>;

    async fn add_comment(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<(), GatewayError>;

    /// Files changed by a pull request, in platform order.
    async fn list_changed_files(
        &self,
        repo: &RepoRef,
        pull_number: u64,
    ) -> Result<Vec<FileChange>, GatewayError>;
}

/// The two kinds of documentation artifact the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    /// A documentation page for a source file.
    Doc,
    /// The navigation/index file listing documentation pages.
    Navigation,
}

/// Everything the generator gets to produce one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub kind: DocKind,
    pub target_path: String,
    /// Current content of the target (draft from the open PR, else the stable branch).
    pub prior_content: Option<String>,
    pub change_summary: String,
    /// Contents of similar documents to steer style.
    pub templates: Vec<String>,
    pub options: GenerationOptions,
}

/// Trait for the text-generation service.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Produce the full new content for `request.target_path`.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError>;
}
