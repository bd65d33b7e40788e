//! depmap CLI - map source files to the executables that depend on them

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("depmap=debug")
    } else {
        EnvFilter::new("depmap=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Commands::Parse(args) => commands::parse::execute(args, cli.verbose),
        Commands::Select(args) => commands::select::execute(args),
        Commands::Audit(args) => commands::audit::execute(args),
        Commands::Optimize(args) => commands::optimize::execute(args),
    }
}
