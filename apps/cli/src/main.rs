//! Prepnest CLI: batch rewriting of OCR-extracted lessons.
//!
//! Pulls pending lessons from the Sanity Content Lake, runs curriculum
//! alignment and rewriting through the generation service, and writes the
//! results back for editorial review.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
