//! Continuously package and deploy functions as sources change

use crate::util;
use anyhow::{Context, Result};
use cli_lib::{ui, Orchestrator, Session};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use watcher::WatchOptions;

pub async fn run(config: Option<&Path>, verbose: bool) -> Result<()> {
    let config = util::load_develop_config(config, verbose)?;
    util::init_tracing(config.develop.verbose);

    if config.develop.verbose {
        info!("------------------------");
        info!("Running in verbose mode!");
        info!("------------------------");
    }

    let watch_root = config.watch_root();
    let options = WatchOptions::from_config(&config);
    if config.develop.verbose {
        info!("Excluded paths: ({})", options.exclude.join("|"));
    }

    let session = Arc::new(Session::new(config)?);
    let mut orchestrator = Orchestrator::from_session(session.clone(), ui::terminal_sink())?;

    // Bootstrap
    let progress = ui::packaging_progress(session.functions().len() as u64);
    let summary = orchestrator.prepare(&progress).await?;
    if !summary.is_success() {
        println!(
            "{} {}",
            "Initial packaging failed for:".yellow(),
            summary.failed.join(", ")
        );
    }

    // Watch until interrupted
    let stream = watcher::watch(&watch_root, options)
        .with_context(|| format!("Failed to watch {}", watch_root.display()))?;
    println!("Watching {}", watch_root.display().to_string().cyan());

    tokio::select! {
        _ = orchestrator.run(stream) => {
            println!("Watcher stopped");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            println!();
            println!("Stopping");
        }
    }
    Ok(())
}
