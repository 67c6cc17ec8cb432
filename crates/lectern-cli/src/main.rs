//! `lectern` binary.

use anyhow::Result;
use clap::Parser;
use lectern_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    lectern_cli::run(Cli::parse()).await
}
