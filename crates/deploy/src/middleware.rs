//! Pre-build commands run before every change cycle

use crate::process::{run_shell, ProcessResult};
use sdev_core::{DevelopError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Runs the configured middleware commands in order, stopping at the first failure
#[derive(Debug, Clone)]
pub struct MiddlewareRunner {
    commands: Vec<String>,
    cwd: PathBuf,
    verbose: bool,
}

impl MiddlewareRunner {
    pub fn new(commands: Vec<String>, cwd: &Path, verbose: bool) -> Self {
        Self {
            commands,
            cwd: cwd.to_path_buf(),
            verbose,
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run every command, invoking `on_start`/`on_finish` around each one
    ///
    /// A command that cannot be spawned counts as a failure without exit code.
    pub async fn run<S, F>(&self, mut on_start: S, mut on_finish: F) -> Result<()>
    where
        S: FnMut(&str),
        F: FnMut(&str),
    {
        for command in &self.commands {
            on_start(command);

            let result = run_shell(command, &self.cwd).await.map_err(|e| {
                debug!("Cannot spawn middleware `{}`: {}", command, e);
                DevelopError::Middleware {
                    command: command.clone(),
                    exit_code: None,
                }
            })?;

            self.log_output(command, &result);

            if !result.success() {
                return Err(DevelopError::Middleware {
                    command: command.clone(),
                    exit_code: result.exit_code,
                });
            }

            on_finish(command);
        }
        Ok(())
    }

    fn log_output(&self, command: &str, result: &ProcessResult) {
        if !self.verbose {
            return;
        }
        if !result.stdout.trim().is_empty() {
            info!("[{}] {}", command, result.stdout.trim_end());
        }
        if !result.stderr.trim().is_empty() {
            info!("[{}] {}", command, result.stderr.trim_end());
        }
    }
}
