//! sdev CLI - sdev command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod util;

/// sdev - Continuously deploy your functions as you code
#[derive(Parser)]
#[command(name = "sdev")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter sdev.toml in the current directory
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Watch sources and redeploy impacted functions on every change
    Develop {
        /// Configuration file (default: nearest sdev.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Log dependency trees and subprocess output
        #[arg(short, long)]
        verbose: bool,
    },
    /// Rebuild function archives from scratch
    Package {
        /// Configuration file (default: nearest sdev.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Only package this function
        #[arg(short, long)]
        function: Option<String>,
    },
    /// Show a function's dependency graph
    Graph {
        /// Function name
        function: String,
        /// Configuration file (default: nearest sdev.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `develop` initializes tracing once its config is loaded
    if !matches!(cli.command, Commands::Develop { .. }) {
        util::init_tracing(false);
    }

    match cli.command {
        Commands::Init { force } => cmd::init::run(force).await,
        Commands::Develop { config, verbose } => cmd::develop::run(config.as_deref(), verbose).await,
        Commands::Package { config, function } => {
            cmd::package::run(config.as_deref(), function.as_deref()).await
        }
        Commands::Graph { function, config, json } => {
            cmd::graph::run(&function, config.as_deref(), json).await
        }
    }
}
