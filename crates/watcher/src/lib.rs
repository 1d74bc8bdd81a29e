//! File system watching for sdev
//!
//! This crate provides a polling watcher with:
//! - A ready marker once the initial scan completes
//! - Component-aware exclusion (`node_modules`, build output, hidden files)
//! - Content-hash suppression of no-op saves
//!
//! Events are delivered in detection order through a [`ChangeStream`].

mod exclude;
mod poll;

pub use exclude::IgnoreRules;
pub use poll::TreeState;

use sdev_core::{ChangeEvent, DevelopConfig, DevelopError, Result};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Pending events buffered between the scanner and the consumer
const CHANNEL_CAPACITY: usize = 256;

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Time between scans
    pub poll_interval: Duration,
    /// Gitignore-style patterns never reported
    pub exclude: Vec<String>,
    /// Skip dot-files and dot-directories
    pub ignore_hidden: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            exclude: vec!["node_modules".to_string()],
            ignore_hidden: true,
        }
    }
}

impl WatchOptions {
    pub fn from_config(config: &DevelopConfig) -> Self {
        Self {
            poll_interval: config.change_interval(),
            exclude: config.exclude_patterns(),
            ignore_hidden: true,
        }
    }
}

/// Start watching `root`
///
/// Must be called from within a tokio runtime. Fails immediately if `root`
/// is not a directory; a later scan failure ends the stream instead.
pub fn watch(root: &Path, options: WatchOptions) -> Result<ChangeStream> {
    if !root.is_dir() {
        return Err(DevelopError::config(format!(
            "watch root {} is not a directory",
            root.display()
        )));
    }
    if options.poll_interval.is_zero() {
        return Err(DevelopError::config("poll interval must be positive"));
    }

    let rules = IgnoreRules::new(root, &options.exclude, options.ignore_hidden)?;
    let state = TreeState::new(root.to_path_buf(), rules);

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(poll::run(state, options.poll_interval, tx));

    debug!("Spawned watcher for {}", root.display());
    Ok(ChangeStream {
        rx,
        task: Some(task),
    })
}

/// Ordered stream of change events
///
/// Dropping the stream stops the underlying scanner.
pub struct ChangeStream {
    rx: mpsc::Receiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl ChangeStream {
    /// Stream fed by an arbitrary sender, with no scanner attached
    pub fn from_receiver(rx: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { rx, task: None }
    }

    /// Next event, or None once the watcher has stopped
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Stop the scanner; buffered events can still be drained
    pub fn close(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
