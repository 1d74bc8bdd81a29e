//! Write a starter `sdev.toml`

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use sdev_core::config::{example_config, CONFIG_FILE};
use std::env;

pub async fn run(force: bool) -> Result<()> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    let path = current_dir.join(CONFIG_FILE);

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    tokio::fs::write(&path, example_config())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display().to_string().cyan());
    println!();
    println!("Next steps:");
    println!("  - Declare your functions under [[functions]]");
    println!("  - Run 'sdev package' once the stack has been deployed");
    println!("  - Run 'sdev develop' to start the loop");
    Ok(())
}
