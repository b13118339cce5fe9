//! In-memory git-hosting platform and generator for pipeline scenario tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use docsync_core::contract::{
    ChangeType, ContentGenerator, DocKind, FileChange, FileWrite, GatewayError,
    GenerationRequest, NewPullRequest, PullRequestSummary, RemoteFile, RepoRef,
    RepositoryGateway,
};

#[derive(Debug, Default)]
pub struct Platform {
    pub branches: BTreeMap<String, String>,
    /// (branch, path) -> (content, sha)
    pub files: BTreeMap<(String, String), (String, String)>,
    pub open_prs: Vec<PullRequestSummary>,
    pub change_files: BTreeMap<u64, Vec<FileChange>>,
    pub labels: BTreeMap<u64, Vec<String>>,
    pub comments: Vec<(u64, String)>,
    pub writes: Vec<FileWrite>,
    pub branches_created: usize,
    pub prs_created: usize,
    pub prs_updated: usize,
    pub next_number: u64,
    pub failing_reads: BTreeSet<String>,
    sha_counter: u64,
}

/// Stateful fake: branches, files, PRs and comments behave like a real platform
/// closely enough for reruns to observe what earlier runs did.
#[derive(Debug)]
pub struct FakeGateway {
    pub default_branch: String,
    pub platform: Mutex<Platform>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let mut platform = Platform {
            next_number: 100,
            ..Default::default()
        };
        platform
            .branches
            .insert("main".to_string(), "sha-main".to_string());
        Self {
            default_branch: "main".to_string(),
            platform: Mutex::new(platform),
        }
    }

    pub fn with_change(self, number: u64, files: &[(&str, ChangeType)]) -> Self {
        self.platform.lock().unwrap().change_files.insert(
            number,
            files
                .iter()
                .map(|(path, change_type)| FileChange {
                    path: path.to_string(),
                    diff: Some(format!("+ export const changed = \"{path}\";")),
                    change_type: *change_type,
                })
                .collect(),
        );
        self
    }

    pub fn with_file(self, branch: &str, path: &str, content: &str) -> Self {
        {
            let mut platform = self.platform.lock().unwrap();
            platform.sha_counter += 1;
            let sha = format!("blob-{}", platform.sha_counter);
            platform
                .files
                .insert((branch.to_string(), path.to_string()), (content.to_string(), sha));
        }
        self
    }

    pub fn with_open_pr(self, pr: PullRequestSummary) -> Self {
        self.platform.lock().unwrap().open_prs.push(pr);
        self
    }

    pub fn failing_read(self, path: &str) -> Self {
        self.platform
            .lock()
            .unwrap()
            .failing_reads
            .insert(path.to_string());
        self
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&Platform) -> T) -> T {
        let platform = self.platform.lock().unwrap();
        f(&*platform)
    }
}

#[async_trait]
impl RepositoryGateway for FakeGateway {
    async fn get_default_branch(&self, _repo: &RepoRef) -> Result<String, GatewayError> {
        Ok(self.default_branch.clone())
    }

    async fn get_branch_tip(
        &self,
        _repo: &RepoRef,
        branch: &str,
    ) -> Result<Option<String>, GatewayError> {
        Ok(self.platform.lock().unwrap().branches.get(branch).cloned())
    }

    async fn create_branch(
        &self,
        _repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<(), GatewayError> {
        let mut platform = self.platform.lock().unwrap();
        if platform.branches.contains_key(name) {
            return Err(format!("Reference already exists: {name}").into());
        }
        platform
            .branches
            .insert(name.to_string(), from_sha.to_string());
        // A new branch starts with the default branch's tree.
        let inherited: Vec<_> = platform
            .files
            .iter()
            .filter(|((branch, _), _)| *branch == self.default_branch)
            .map(|((_, path), file)| ((name.to_string(), path.clone()), file.clone()))
            .collect();
        platform.files.extend(inherited);
        platform.branches_created += 1;
        Ok(())
    }

    async fn read_file(
        &self,
        _repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<RemoteFile>, GatewayError> {
        let platform = self.platform.lock().unwrap();
        if platform.failing_reads.contains(path) {
            return Err(format!("read of {path} failed").into());
        }
        Ok(platform
            .files
            .get(&(reference.to_string(), path.to_string()))
            .map(|(content, sha)| RemoteFile {
                content: content.clone(),
                sha: sha.clone(),
                last_modified: Some("Mon, 05 Oct 2026 10:00:00 GMT".to_string()),
            }))
    }

    async fn write_file(&self, _repo: &RepoRef, write: FileWrite) -> Result<(), GatewayError> {
        let mut platform = self.platform.lock().unwrap();
        if !platform.branches.contains_key(&write.branch) {
            return Err(format!("branch {} not found", write.branch).into());
        }
        let key = (write.branch.clone(), write.path.clone());
        let current_sha = platform.files.get(&key).map(|(_, sha)| sha.clone());
        if current_sha != write.prior_sha {
            return Err(format!("sha mismatch for {}", write.path).into());
        }
        platform.sha_counter += 1;
        let sha = format!("blob-{}", platform.sha_counter);
        platform.files.insert(key, (write.content.clone(), sha));
        platform.writes.push(write);
        Ok(())
    }

    async fn list_open_pull_requests(
        &self,
        _repo: &RepoRef,
    ) -> Result<Vec<PullRequestSummary>, GatewayError> {
        Ok(self.platform.lock().unwrap().open_prs.clone())
    }

    async fn create_pull_request(
        &self,
        _repo: &RepoRef,
        request: NewPullRequest,
    ) -> Result<u64, GatewayError> {
        let mut platform = self.platform.lock().unwrap();
        let number = platform.next_number;
        platform.next_number += 1;
        platform.open_prs.push(PullRequestSummary {
            number,
            title: request.title,
            body: Some(request.body),
            head_ref: request.head,
            base_ref: request.base,
        });
        platform.prs_created += 1;
        Ok(number)
    }

    async fn update_pull_request(
        &self,
        _repo: &RepoRef,
        number: u64,
        title: &str,
        body: &str,
    ) -> Result<(), GatewayError> {
        let mut platform = self.platform.lock().unwrap();
        let pr = platform
            .open_prs
            .iter_mut()
            .find(|pr| pr.number == number)
            .ok_or_else(|| format!("pull request #{number} not found"))?;
        pr.title = title.to_string();
        pr.body = Some(body.to_string());
        platform.prs_updated += 1;
        Ok(())
    }

    async fn set_labels(
        &self,
        _repo: &RepoRef,
        issue_number: u64,
        labels: &[String],
    ) -> Result<(), GatewayError> {
        self.platform
            .lock()
            .unwrap()
            .labels
            .insert(issue_number, labels.to_vec());
        Ok(())
    }

    async fn add_comment(
        &self,
        _repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<(), GatewayError> {
        self.platform
            .lock()
            .unwrap()
            .comments
            .push((issue_number, body.to_string()));
        Ok(())
    }

    async fn list_changed_files(
        &self,
        _repo: &RepoRef,
        pull_number: u64,
    ) -> Result<Vec<FileChange>, GatewayError> {
        let platform = self.platform.lock().unwrap();
        if let Some(files) = platform.change_files.get(&pull_number) {
            return Ok(files.clone());
        }
        // Documentation PRs: files written onto their head branch.
        let Some(pr) = platform.open_prs.iter().find(|pr| pr.number == pull_number) else {
            return Err(format!("pull request #{pull_number} not found").into());
        };
        let mut paths: Vec<String> = platform
            .writes
            .iter()
            .filter(|w| w.branch == pr.head_ref)
            .map(|w| w.path.clone())
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths
            .into_iter()
            .map(|path| FileChange {
                path,
                diff: None,
                change_type: ChangeType::Modified,
            })
            .collect())
    }
}

/// Generator producing a page that passes the default quality rules, and records
/// every request it receives.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    pub requests: Mutex<Vec<GenerationRequest>>,
    pub short_output: bool,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn producing_short_pages() -> Self {
        Self {
            short_output: true,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let content = match request.kind {
            DocKind::Navigation => "{\"navigation\":[{\"group\":\"LLM\",\"pages\":[\"llm/openai\"]}]}".to_string(),
            DocKind::Doc if self.short_output => "Too short.".to_string(),
            DocKind::Doc => {
                let mut page = format!(
                    "# {}\n\nThis page describes the provider and how to configure it.\n\n```ts\nimport {{ OpenAI }} from \"./openai\";\nconst client = new OpenAI({{ apiKey: process.env.OPENAI_API_KEY }});\n```\n\n",
                    request.target_path
                );
                if request.prior_content.is_some() {
                    page.push_str("Revised after further changes.\n\n");
                }
                while page.chars().count() < 500 {
                    page.push_str("The client retries nothing and surfaces every error. ");
                }
                page
            }
        };
        self.requests.lock().unwrap().push(request);
        Ok(content)
    }
}

pub fn repo() -> RepoRef {
    RepoRef::new("acme", "widgets")
}

pub fn documentation_pr(number: u64, change_id: u64, head: &str) -> PullRequestSummary {
    PullRequestSummary {
        number,
        title: format!("{}: Add OpenAI provider", docsync_core::matching::DOC_PR_MARKER),
        body: Some(format!("Automated documentation update.\n\nDocuments changes from #{change_id}.")),
        head_ref: head.to_string(),
        base_ref: "main".to_string(),
    }
}
