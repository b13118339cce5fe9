use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Immutable configuration snapshot for a pipeline run. Every section has defaults,
/// so an empty YAML/JSON object is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathRules,
    pub navigation: NavigationConfig,
    /// Branch holding the merged documentation tree; the repository default when unset.
    pub stable_branch: Option<String>,
    pub generation: GenerationOptions,
    pub quality: QualityRules,
    pub pull_request: PullRequestConfig,
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            source_root = %self.paths.source_root,
            docs_root = %self.paths.docs_root,
            doc_extension = %self.paths.doc_extension,
            navigation = %self.navigation.path,
            labels = self.pull_request.labels.len(),
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}

/// Match rules mapping source files onto documentation files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathRules {
    pub source_root: String,
    pub docs_root: String,
    /// Extension (without dot) given to documentation files.
    pub doc_extension: String,
    /// Source extensions (without dot) that get documentation. Empty means all.
    pub source_extensions: Vec<String>,
}

impl Default for PathRules {
    fn default() -> Self {
        Self {
            source_root: "src/".to_string(),
            docs_root: "docs/".to_string(),
            doc_extension: "mdx".to_string(),
            source_extensions: ["ts", "tsx", "js", "jsx", "py", "rs", "go"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Well-known path of the navigation/index file.
    pub path: String,
    /// Regenerate the navigation file after documentation pages are written.
    pub update: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            path: "docs/mint.json".to_string(),
            update: true,
        }
    }
}

/// Options passed through to the content generator untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Minimum-quality checks applied to generated documentation pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityRules {
    pub min_length: usize,
    pub placeholder_markers: Vec<String>,
    pub require_code_example: bool,
}

impl Default for QualityRules {
    fn default() -> Self {
        Self {
            min_length: 200,
            placeholder_markers: ["[TODO]", "[PLACEHOLDER]", "[INSERT", "Lorem ipsum", "TBD"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            require_code_example: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestConfig {
    /// Base branch for new documentation PRs; the repository default when unset.
    pub base: Option<String>,
    pub labels: Vec<String>,
}

impl Default for PullRequestConfig {
    fn default() -> Self {
        Self {
            base: None,
            labels: vec!["documentation".to_string()],
        }
    }
}
