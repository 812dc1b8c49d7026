//! CLI entry point for moodle-fetch.

use anyhow::Result;
use clap::Parser;

mod app;
mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();
    app::runtime::run(cli).await
}
