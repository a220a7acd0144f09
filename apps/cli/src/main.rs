//! CourseBuilder CLI: generate an intelligent-textbook site from a topic.
//!
//! Sequences model calls through the twelve pipeline stages and writes an
//! mkdocs site with chapters, quizzes, simulations and a learning graph.

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
