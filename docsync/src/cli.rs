///
/// This module implements the CLI interface for docsync: command parsing, wiring the
/// GitHub gateway and the content generator into the core pipeline, and printing
/// results.
///
/// All reconciliation logic lives in the [`docsync-core`] crate. This module is
/// strictly CLI glue.
///
/// ## Subcommands
/// - `run --config <yaml> --change <number>`: document one pull request.
/// - `doc-path <source> [--config <yaml>]`: print the documentation path for a source file.
/// - `actions`: print the action catalog for external planners.
///
/// [`docsync-core`]: ../../docsync-core/
use crate::generator::OpenAiGenerator;
use crate::github::GitHubClient;
use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use docsync_core::action::ActionContext;
use docsync_core::actions::catalog;
use docsync_core::config::PathRules;
use docsync_core::discovery::documentation_target;
use docsync_core::links::JsonFileLinkStore;
use docsync_core::pipeline::run_reconciliation_pipeline;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for docsync: keep documentation in sync with source changes.
#[derive(Parser)]
#[clap(
    name = "docsync",
    version,
    about = "Generate documentation updates for source changes and reconcile them into one pull request"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate or update documentation for a pull request
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Number of the originating pull request
        #[clap(long)]
        change: u64,
    },
    /// Print the documentation path derived from a source path
    DocPath {
        /// Repository-relative source path, e.g. src/llm/openai.ts
        source: String,
        /// Path to the YAML config file; default path rules when omitted
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Print the action catalog as JSON
    Actions,
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run { config, change } => run_pipeline(config, change).await,
        Commands::DocPath { source, config } => {
            let rules = match config {
                Some(path) => load_config(path)?.pipeline.paths,
                None => PathRules::default(),
            };
            match documentation_target(&source, &rules) {
                Some(doc_path) => {
                    println!("{doc_path}");
                    Ok(())
                }
                None => Err(anyhow::anyhow!(
                    "'{source}' is not a documented source file under '{}'",
                    rules.source_root
                )),
            }
        }
        Commands::Actions => {
            println!("{}", serde_json::to_string_pretty(&catalog())?);
            Ok(())
        }
    }
}

async fn run_pipeline(config_path: PathBuf, change_number: u64) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!(command = "run", repository = %config.repository, change = change_number, "Starting documentation run");

    let gateway = Arc::new(GitHubClient::new_from_env()?);
    let generator = Arc::new(OpenAiGenerator::new_from_env()?);

    let change = gateway
        .get_pull_request(&config.repository, change_number)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch pull request #{change_number}: {e}"))?;

    let mut ctx = ActionContext::new(config.repository.clone(), gateway, generator);
    if let Some(links_file) = &config.links_file {
        tracing::info!(links_file = ?links_file, "Using change-link store");
        ctx = ctx.with_links(Arc::new(JsonFileLinkStore::new(links_file)));
    }

    match run_reconciliation_pipeline(ctx, change, None, Arc::new(config.pipeline)).await {
        Ok(outcome) => {
            tracing::info!(command = "run", ?outcome, "Documentation run complete");
            match (&outcome.branch, outcome.pull_request_number) {
                (Some(branch), Some(number)) => {
                    println!("Documentation pull request #{number} on branch {branch}");
                    for path in &outcome.files_written {
                        println!("  {path}");
                    }
                }
                _ => println!("No documentation changes for pull request #{change_number}"),
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "run", error = %e, "Documentation run failed");
            Err(e.into())
        }
    }
}
