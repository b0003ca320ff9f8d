//! LeadSift CLI: business-listing export cleaner and sorter.
//!
//! Cleans exports against a blacklist and a category map, and splits them
//! into prospecting buckets.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
