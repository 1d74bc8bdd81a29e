//! Package functions from scratch without watching

use crate::util;
use anyhow::Result;
use cli_lib::{ui, Orchestrator, Session};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;

pub async fn run(config: Option<&Path>, function: Option<&str>) -> Result<()> {
    let config = util::load_config(config)?;
    let session = Arc::new(Session::new(config)?);
    let orchestrator = Orchestrator::from_session(session.clone(), ui::terminal_sink())?;

    let total = function.map(|_| 1).unwrap_or(session.functions().len());
    let progress = ui::packaging_progress(total as u64);
    let summary = orchestrator.package_all(function, &progress).await?;

    println!();
    println!(
        "{} packaged into {}",
        summary.packaged.len().to_string().green(),
        session.config().package_dir().display()
    );
    if !summary.is_success() {
        anyhow::bail!("Packaging failed for: {}", summary.failed.join(", "));
    }
    Ok(())
}
