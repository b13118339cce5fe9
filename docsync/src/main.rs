use anyhow::Result;
use clap::Parser;
use docsync::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file.
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "docsync starting");
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "docsync failed");
        return Err(e);
    }
    Ok(())
}
