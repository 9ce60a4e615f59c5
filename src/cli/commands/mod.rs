//! CLI command implementations
//!
//! Each subcommand has its own module with an Args struct and a `run()`.

use clap::Subcommand;

pub mod check;
pub mod config;
pub mod search;

use crate::app::AppContext;
use crate::error::Result;

pub async fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Search(args) => search::run(ctx, args).await,
        Commands::Check(args) => check::run(ctx, args).await,
        Commands::Config(args) => config::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search every enabled source and rank the postings
    Search(search::SearchArgs),

    /// Probe the semantic oracle and list source endpoints
    Check(check::CheckArgs),

    /// Show the effective configuration
    Config(config::ConfigArgs),
}
