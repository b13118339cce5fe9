//! Documentation discovery: which documentation files a change touches and what they
//! currently contain.
//!
//! Reads are fanned out concurrently with `join_all`; results come back in input
//! order and are sorted by path, so the resulting [`DocInfo`] never depends on
//! completion order. A single unreadable file is recorded as "content absent" and
//! does not abort discovery.

use std::collections::BTreeSet;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::{PathRules, PipelineConfig};
use crate::contract::{ChangeType, DocKind, RepoRef, RepositoryGateway};
use crate::error::{remote, PipelineError};
use crate::links::LinkStore;
use crate::matching::locate_documentation_pr;
use crate::state::{CommitInfo, DocFile, DocInfo, ExistingPr, PrFile};

fn with_trailing_slash(root: &str) -> String {
    let trimmed = root.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Extension of the last path segment, without the dot. Dotfiles have none.
fn extension(path: &str) -> Option<&str> {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(&file[i + 1..]),
    }
}

/// Map a source path onto its documentation path by swapping the source root for the
/// docs root and the extension for the documentation extension.
///
/// `src/foo/bar.ts` becomes `docs/foo/bar.mdx` with the default rules. Returns `None`
/// for paths outside the source root.
pub fn derive_doc_path(source_path: &str, rules: &PathRules) -> Option<String> {
    let source_root = with_trailing_slash(&rules.source_root);
    let relative = source_path.strip_prefix(source_root.as_str())?;
    if relative.is_empty() || relative.ends_with('/') {
        return None;
    }

    let stem = match extension(relative) {
        Some(ext) => &relative[..relative.len() - ext.len() - 1],
        None => relative,
    };
    Some(format!(
        "{}{stem}.{}",
        with_trailing_slash(&rules.docs_root),
        rules.doc_extension.trim_start_matches('.')
    ))
}

/// Whether a source file's extension is one that gets documentation.
pub fn has_documented_extension(source_path: &str, rules: &PathRules) -> bool {
    rules.source_extensions.is_empty()
        || extension(source_path).is_some_and(|ext| {
            rules
                .source_extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.') == ext)
        })
}

/// Documentation path for a changed file, when the file should be documented at all.
pub fn documentation_target(source_path: &str, rules: &PathRules) -> Option<String> {
    if has_documented_extension(source_path, rules) {
        derive_doc_path(source_path, rules)
    } else {
        None
    }
}

/// All distinct documentation paths affected by a change, sorted.
pub fn documentation_targets(commit: &CommitInfo, rules: &PathRules) -> BTreeSet<String> {
    commit
        .files
        .iter()
        .filter(|f| f.change_type != ChangeType::Deleted)
        .filter_map(|f| documentation_target(&f.path, rules))
        .collect()
}

/// Build [`DocInfo`] for a change.
pub async fn discover_documentation<G>(
    gateway: &G,
    links: Option<&dyn LinkStore>,
    repo: &RepoRef,
    commit: &CommitInfo,
    config: &PipelineConfig,
) -> Result<DocInfo, PipelineError>
where
    G: RepositoryGateway + ?Sized,
{
    info!(repo = %repo, files = commit.files.len(), "[DISCOVERY] Discovering documentation files");

    let existing_pr = match commit.number {
        Some(id) => match locate_documentation_pr(gateway, links, repo, id).await? {
            Some(pr) => Some(snapshot_open_pr(gateway, repo, pr.number, pr.head_ref).await?),
            None => None,
        },
        None => None,
    };

    let stable = match &config.stable_branch {
        Some(branch) => branch.clone(),
        None => gateway
            .get_default_branch(repo)
            .await
            .map_err(remote("get_default_branch"))?,
    };

    let mut lookups: Vec<(String, DocKind)> = documentation_targets(commit, &config.paths)
        .into_iter()
        .map(|path| (path, DocKind::Doc))
        .collect();
    if !lookups.iter().any(|(p, _)| *p == config.navigation.path) {
        lookups.push((config.navigation.path.clone(), DocKind::Navigation));
    }

    let stable_ref = stable.as_str();
    let mut files: Vec<DocFile> = join_all(lookups.iter().map(|(path, kind)| async move {
        let file = match gateway.read_file(repo, path, stable_ref).await {
            Ok(Some(file)) => Some(file),
            Ok(None) => {
                debug!(path = %path, reference = stable_ref, "[DISCOVERY] Documentation file does not exist yet");
                None
            }
            Err(e) => {
                warn!(path = %path, error = %e, "[DISCOVERY] Failed to read documentation file, treating as absent");
                None
            }
        };
        DocFile {
            path: path.clone(),
            kind: *kind,
            last_modified: file.as_ref().and_then(|f| f.last_modified.clone()),
            content: file.map(|f| f.content),
        }
    }))
    .await;
    files.sort_by(|a, b| a.path.cmp(&b.path));

    info!(
        documents = files.len(),
        existing = files.iter().filter(|f| f.content.is_some()).count(),
        open_pr = existing_pr.as_ref().map(|pr| pr.number),
        "[DISCOVERY] Discovery complete"
    );
    Ok(DocInfo { files, existing_pr })
}

/// Content of every file the open documentation PR changed, read at its head branch.
async fn snapshot_open_pr<G>(
    gateway: &G,
    repo: &RepoRef,
    number: u64,
    branch: String,
) -> Result<ExistingPr, PipelineError>
where
    G: RepositoryGateway + ?Sized,
{
    let changed = gateway
        .list_changed_files(repo, number)
        .await
        .map_err(remote("list_changed_files"))?;

    let head = branch.as_str();
    let reads = changed
        .iter()
        .filter(|f| f.change_type != ChangeType::Deleted)
        .map(|f| async move {
            match gateway.read_file(repo, &f.path, head).await {
                Ok(Some(file)) => Some(PrFile {
                    path: f.path.clone(),
                    content: file.content,
                }),
                Ok(None) => None,
                Err(e) => {
                    warn!(pr = number, path = %f.path, error = %e, "[DISCOVERY] Failed to read drafted file, skipping");
                    None
                }
            }
        });
    let mut files: Vec<PrFile> = join_all(reads).await.into_iter().flatten().collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    info!(pr = number, branch = %branch, drafted = files.len(), "[DISCOVERY] Found open documentation PR");
    Ok(ExistingPr {
        number,
        branch,
        files,
    })
}
