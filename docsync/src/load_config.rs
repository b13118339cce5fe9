/// `load_config` module: loads the static YAML config file for the CLI.
///
/// The file names the target repository, an optional change-link store, and the
/// pipeline sections of [`PipelineConfig`]. Secrets never live here; the gateway and
/// generator read them from the environment.
///
/// ```yaml
/// repository:
///   owner: acme
///   name: widgets
/// links_file: .docsync/links.json
/// paths:
///   source_root: src/
///   docs_root: docs/
/// pull_request:
///   labels: [documentation]
/// ```
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use docsync_core::config::PipelineConfig;
use docsync_core::contract::RepoRef;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub repository: RepoRef,
    /// JSON file persisting change → documentation branch/PR links across runs.
    #[serde(default)]
    pub links_file: Option<PathBuf>,
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
}

/// Loads a static YAML config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config = parse_config(&config_content)?;
    info!(
        config_path = ?path_ref,
        repository = %config.repository,
        links_file = ?config.links_file,
        "Parsed config YAML successfully"
    );
    Ok(config)
}

/// Parses YAML config text. An absent file section falls back to its defaults.
pub fn parse_config(yaml: &str) -> Result<CliConfig> {
    serde_yaml::from_str(yaml).map_err(|e| {
        error!(error = ?e, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })
}
