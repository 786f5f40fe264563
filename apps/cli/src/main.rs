//! manpager CLI: man-page corpus preparation tool.
//!
//! Renders troff man pages, parses them into structured documents, and
//! writes a chunked, cross-referenced corpus for retrieval indexing.

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
