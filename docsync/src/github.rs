#![doc = "GitHub REST implementation of the repository gateway used by the CLI."]
//
//! # GitHub gateway
//!
//! [`GitHubClient`] implements [`RepositoryGateway`] over the GitHub REST v3 API with a
//! bearer token. It is the only place in docsync that knows GitHub's URL layout and
//! JSON shapes; everything it returns is mapped to the core's contract types.
//!
//! - Construct with [`GitHubClient::new_from_env`] (`GITHUB_TOKEN`, optional
//!   `GITHUB_API_URL` for GitHub Enterprise).
//! - A `404` on a branch ref or file is "does not exist" (`Ok(None)`), never an error.
//! - Any other non-success status becomes `GitHub API error (<status>): <body>`.
//!
//! No retries are attempted; the core treats every failure as fatal for the run.

use std::env;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, LAST_MODIFIED, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use docsync_core::actions::OriginatingChange;
use docsync_core::contract::{
    ChangeType, FileChange, FileWrite, GatewayError, NewPullRequest, PullRequestSummary,
    RemoteFile, RepoRef, RepositoryGateway,
};
use docsync_core::PipelineError;

const DEFAULT_API_URL: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from `GITHUB_TOKEN` and optional `GITHUB_API_URL`.
    pub fn new_from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        let token = match env::var("GITHUB_TOKEN") {
            Ok(token) if !token.trim().is_empty() => token,
            _ => {
                error!("GITHUB_TOKEN missing in environment");
                return Err(PipelineError::MissingCredential {
                    name: "GITHUB_TOKEN".to_string(),
                });
            }
        };
        let api_url = env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        info!(api_url = %api_url, "Initialized GitHubClient from environment");
        Ok(Self::new(token, api_url))
    }

    fn repo_url(&self, repo: &RepoRef, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_url, repo.owner, repo.name, path)
    }

    /// Like [`Self::repo_url`], but `path` is a repository path whose segments are
    /// percent-encoded individually.
    fn repo_path_url(&self, repo: &RepoRef, endpoint: &str, path: &str) -> Result<String, GatewayError> {
        encoded_path_url(&self.repo_url(repo, endpoint), path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, "docsync")
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await?;
        check_status(response).await
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, GatewayError> {
        Ok(self.send(builder).await?.json().await?)
    }

    /// Sends a GET and maps `404` to `None`.
    async fn get_optional(&self, url: &str, query: &[(&str, &str)]) -> Result<Option<Response>, GatewayError> {
        let response = self.request(Method::GET, url).query(query).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(url = %url, "GitHub resource not found");
            return Ok(None);
        }
        Ok(Some(check_status(response).await?))
    }

    async fn get_pages(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<Value>, GatewayError> {
        let mut items = Vec::new();
        let per_page = PAGE_SIZE.to_string();
        for page in 1.. {
            let page = page.to_string();
            let mut params = query.to_vec();
            params.push(("per_page", per_page.as_str()));
            params.push(("page", page.as_str()));
            let body = self
                .send_json(self.request(Method::GET, url).query(&params))
                .await?;
            let batch = body
                .as_array()
                .cloned()
                .ok_or("GitHub API returned a non-array page")?;
            let done = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    /// The originating pull request, as the pipeline expects it.
    pub async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<OriginatingChange, GatewayError> {
        let url = self.repo_url(repo, &format!("/pulls/{number}"));
        let body = self.send_json(self.request(Method::GET, &url)).await?;
        let summary = parse_pull_request(&body)?;
        Ok(OriginatingChange {
            number: Some(summary.number),
            title: summary.title,
            description: summary.body.unwrap_or_default(),
            base_branch: summary.base_ref,
            head_branch: summary.head_ref,
        })
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    error!(%status, body = %text, "GitHub API request failed");
    Err(format!("GitHub API error ({status}): {text}").into())
}

fn str_field<'a>(value: &'a Value, pointer: &str) -> Result<&'a str, GatewayError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("GitHub response is missing '{pointer}'").into())
}

pub(crate) fn parse_pull_request(value: &Value) -> Result<PullRequestSummary, GatewayError> {
    Ok(PullRequestSummary {
        number: value
            .get("number")
            .and_then(Value::as_u64)
            .ok_or("GitHub response is missing 'number'")?,
        title: str_field(value, "/title")?.to_string(),
        body: value.get("body").and_then(Value::as_str).map(str::to_string),
        head_ref: str_field(value, "/head/ref")?.to_string(),
        base_ref: str_field(value, "/base/ref")?.to_string(),
    })
}

pub(crate) fn change_type_from_status(status: &str) -> ChangeType {
    match status {
        "added" => ChangeType::Added,
        "removed" => ChangeType::Deleted,
        _ => ChangeType::Modified,
    }
}

pub(crate) fn parse_changed_file(value: &Value) -> Result<FileChange, GatewayError> {
    Ok(FileChange {
        path: str_field(value, "/filename")?.to_string(),
        diff: value.get("patch").and_then(Value::as_str).map(str::to_string),
        change_type: change_type_from_status(str_field(value, "/status")?),
    })
}

/// Contents API base64 is wrapped at 60 columns.
/// Append each `/`-separated segment of `path` to `base`, percent-encoding `#`, `?`,
/// `%` and friends inside a segment.
pub(crate) fn encoded_path_url(base: &str, path: &str) -> Result<String, GatewayError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| format!("'{base}' cannot carry a path"))?
        .pop_if_empty()
        .extend(path.split('/').filter(|segment| !segment.is_empty()));
    Ok(url.into())
}

pub(crate) fn decode_content(encoded: &str) -> Result<String, GatewayError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

#[async_trait]
impl RepositoryGateway for GitHubClient {
    async fn get_default_branch(&self, repo: &RepoRef) -> Result<String, GatewayError> {
        let body = self
            .send_json(self.request(Method::GET, &self.repo_url(repo, "")))
            .await?;
        Ok(str_field(&body, "/default_branch")?.to_string())
    }

    async fn get_branch_tip(
        &self,
        repo: &RepoRef,
        branch: &str,
    ) -> Result<Option<String>, GatewayError> {
        let url = self.repo_path_url(repo, "/git/ref/heads", branch)?;
        let Some(response) = self.get_optional(&url, &[]).await? else {
            return Ok(None);
        };
        let body: Value = response.json().await?;
        Ok(Some(str_field(&body, "/object/sha")?.to_string()))
    }

    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<(), GatewayError> {
        let url = self.repo_url(repo, "/git/refs");
        self.send(
            self.request(Method::POST, &url)
                .json(&json!({ "ref": format!("refs/heads/{name}"), "sha": from_sha })),
        )
        .await?;
        info!(repo = %repo, branch = %name, "Created branch ref");
        Ok(())
    }

    async fn read_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<RemoteFile>, GatewayError> {
        let url = self.repo_path_url(repo, "/contents", path)?;
        let Some(response) = self.get_optional(&url, &[("ref", reference)]).await? else {
            return Ok(None);
        };
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: Value = response.json().await?;
        if body.is_array() {
            return Err(format!("'{path}' is a directory, not a file").into());
        }
        Ok(Some(RemoteFile {
            content: decode_content(str_field(&body, "/content")?)?,
            sha: str_field(&body, "/sha")?.to_string(),
            last_modified,
        }))
    }

    async fn write_file(&self, repo: &RepoRef, write: FileWrite) -> Result<(), GatewayError> {
        let url = self.repo_path_url(repo, "/contents", &write.path)?;
        let mut payload = json!({
            "message": write.message,
            "content": STANDARD.encode(write.content.as_bytes()),
            "branch": write.branch,
        });
        if let Some(sha) = &write.prior_sha {
            payload["sha"] = json!(sha);
        }
        self.send(self.request(Method::PUT, &url).json(&payload))
            .await?;
        info!(repo = %repo, path = %write.path, branch = %write.branch, "Committed file");
        Ok(())
    }

    async fn list_open_pull_requests(
        &self,
        repo: &RepoRef,
    ) -> Result<Vec<PullRequestSummary>, GatewayError> {
        let url = self.repo_url(repo, "/pulls");
        self.get_pages(&url, &[("state", "open")])
            .await?
            .iter()
            .map(parse_pull_request)
            .collect()
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: NewPullRequest,
    ) -> Result<u64, GatewayError> {
        let url = self.repo_url(repo, "/pulls");
        let body = self
            .send_json(self.request(Method::POST, &url).json(&json!({
                "title": request.title,
                "body": request.body,
                "head": request.head,
                "base": request.base,
            })))
            .await?;
        Ok(parse_pull_request(&body)?.number)
    }

    async fn update_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        title: &str,
        body: &str,
    ) -> Result<(), GatewayError> {
        let url = self.repo_url(repo, &format!("/pulls/{number}"));
        self.send(
            self.request(Method::PATCH, &url)
                .json(&json!({ "title": title, "body": body })),
        )
        .await?;
        Ok(())
    }

    async fn set_labels(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        labels: &[String],
    ) -> Result<(), GatewayError> {
        let url = self.repo_url(repo, &format!("/issues/{issue_number}/labels"));
        self.send(self.request(Method::PUT, &url).json(&json!({ "labels": labels })))
            .await?;
        Ok(())
    }

    async fn add_comment(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<(), GatewayError> {
        let url = self.repo_url(repo, &format!("/issues/{issue_number}/comments"));
        self.send(self.request(Method::POST, &url).json(&json!({ "body": body })))
            .await?;
        Ok(())
    }

    async fn list_changed_files(
        &self,
        repo: &RepoRef,
        pull_number: u64,
    ) -> Result<Vec<FileChange>, GatewayError> {
        let url = self.repo_url(repo, &format!("/pulls/{pull_number}/files"));
        self.get_pages(&url, &[])
            .await?
            .iter()
            .map(parse_changed_file)
            .collect()
    }
}
