//! Persisted mapping from an originating change to its documentation branch and PR.
//!
//! Reconcilers consult the store before falling back to the title/body heuristic in
//! [`crate::matching`]. A stored link is only a hint: it is verified against the
//! remote on every use.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{link_io, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationLink {
    pub branch: String,
    pub pull_request: Option<u64>,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait LinkStore: Send + Sync {
    fn get(&self, change_id: u64) -> Result<Option<DocumentationLink>, PipelineError>;
    fn put(&self, change_id: u64, link: DocumentationLink) -> Result<(), PipelineError>;
}

/// In-process store; links live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: Mutex<BTreeMap<u64, DocumentationLink>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkStore for MemoryLinkStore {
    fn get(&self, change_id: u64) -> Result<Option<DocumentationLink>, PipelineError> {
        let links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        Ok(links.get(&change_id).cloned())
    }

    fn put(&self, change_id: u64, link: DocumentationLink) -> Result<(), PipelineError> {
        let mut links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        links.insert(change_id, link);
        Ok(())
    }
}

/// Store backed by a JSON object on disk (`{"42": {"branch": ..., "pull_request": ...}}`).
#[derive(Debug, Clone)]
pub struct JsonFileLinkStore {
    path: PathBuf,
}

impl JsonFileLinkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<u64, DocumentationLink>, PipelineError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| link_io(&self.path, e))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, links: &BTreeMap<u64, DocumentationLink>) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| link_io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(links)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| link_io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| link_io(&self.path, e))?;
        debug!(path = %self.path.display(), links = links.len(), "Saved link store");
        Ok(())
    }
}

impl LinkStore for JsonFileLinkStore {
    fn get(&self, change_id: u64) -> Result<Option<DocumentationLink>, PipelineError> {
        Ok(self.load()?.remove(&change_id))
    }

    fn put(&self, change_id: u64, link: DocumentationLink) -> Result<(), PipelineError> {
        let mut links = self.load()?;
        links.insert(change_id, link);
        self.save(&links)
    }
}
