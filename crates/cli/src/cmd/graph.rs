//! Print a function's dependency graph

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use sdev_core::GraphBuilder;
use std::path::Path;

pub async fn run(function: &str, config: Option<&Path>, json: bool) -> Result<()> {
    let config = util::load_config(config)?;
    let descriptors = config.descriptors()?;
    let descriptor = descriptors
        .iter()
        .find(|f| f.name == function)
        .with_context(|| format!("Unknown function '{}'", function))?;

    let builder = GraphBuilder::new(config.mapper().graph_root());
    let entry = descriptor.entry_abs.clone();
    let graph = tokio::task::spawn_blocking(move || builder.build(&entry))
        .await
        .context("Graph task failed")??;

    if json {
        println!("{}", graph.to_pretty_json());
        return Ok(());
    }

    println!("{} {}", function.bold(), graph.entry().cyan());
    for file in graph.files() {
        let imports = graph.imports(file).unwrap_or_default();
        if imports.is_empty() {
            println!("  {}", file);
        } else {
            println!("  {} {} {}", file, "->".dimmed(), imports.join(", "));
        }
    }
    println!();
    println!("{} files", graph.len());
    Ok(())
}
