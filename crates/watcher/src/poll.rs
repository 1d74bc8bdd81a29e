//! Polling scanner
//!
//! Keeps a stat snapshot of every watched file and diffs it on each tick.
//! A file whose stat changed but whose content hash did not (editor "save"
//! without edits, `touch`) produces no event.

use crate::exclude::IgnoreRules;
use sdev_core::{ChangeEvent, ChangeKind};
use std::collections::{BTreeMap, HashMap};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Stat fields compared between scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStat {
    modified: Option<SystemTime>,
    len: u64,
    nlink: u64,
}

impl FileStat {
    fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
            nlink: link_count(metadata),
        }
    }
}

#[cfg(unix)]
fn link_count(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink()
}

#[cfg(not(unix))]
fn link_count(_metadata: &Metadata) -> u64 {
    1
}

/// Snapshot of the watched tree
pub struct TreeState {
    root: PathBuf,
    rules: IgnoreRules,
    files: BTreeMap<PathBuf, FileStat>,
    /// Content hashes, recorded lazily the first time a file's stat changes
    hashes: HashMap<PathBuf, blake3::Hash>,
}

impl TreeState {
    pub fn new(root: PathBuf, rules: IgnoreRules) -> Self {
        Self {
            root,
            rules,
            files: BTreeMap::new(),
            hashes: HashMap::new(),
        }
    }

    /// Record the initial snapshot without reporting anything
    pub fn scan(&mut self) -> io::Result<()> {
        self.files = self.snapshot()?;
        self.hashes.clear();
        debug!("Initial scan of {}: {} files", self.root.display(), self.files.len());
        Ok(())
    }

    /// Diff the tree against the last snapshot
    ///
    /// On error the previous snapshot is kept, so the next successful poll
    /// still reports everything that changed in between.
    pub fn poll(&mut self) -> io::Result<Vec<ChangeEvent>> {
        let current = self.snapshot()?;
        let mut events = Vec::new();

        for (path, stat) in &current {
            match self.files.get(path) {
                None => {
                    events.push(ChangeEvent::new(path.clone(), ChangeKind::Added));
                }
                Some(previous) if previous != stat => {
                    if self.content_changed(path) {
                        events.push(ChangeEvent::new(path.clone(), ChangeKind::Modified));
                    } else {
                        debug!("Suppressed no-op save: {}", path.display());
                    }
                }
                Some(_) => {}
            }
        }

        for path in self.files.keys() {
            if !current.contains_key(path) {
                events.push(ChangeEvent::new(path.clone(), ChangeKind::Removed));
            }
        }

        for event in &events {
            if event.kind == ChangeKind::Removed {
                self.hashes.remove(event.path());
            }
        }

        self.files = current;
        Ok(events)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Rehash `path`; true when the content differs from the recorded hash
    fn content_changed(&mut self, path: &Path) -> bool {
        let hash = match std::fs::read(path) {
            Ok(bytes) => blake3::hash(&bytes),
            Err(e) => {
                debug!("Cannot hash {}: {}", path.display(), e);
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.insert(path.to_path_buf(), hash) {
            Some(previous) => previous != hash,
            None => true,
        }
    }

    fn snapshot(&self) -> io::Result<BTreeMap<PathBuf, FileStat>> {
        let mut files = BTreeMap::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.rules.should_ignore(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                // The root itself is unreadable: nothing sensible to diff
                Err(e) if e.depth() == 0 => return Err(walk_error(e)),
                // Entries vanishing mid-walk show up as removals next tick
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let stat = FileStat::from_metadata(&metadata);
            // Unlinked but still open somewhere: counts as removed
            if stat.nlink == 0 {
                continue;
            }
            files.insert(entry.into_path(), stat);
        }

        Ok(files)
    }
}

fn walk_error(error: walkdir::Error) -> io::Error {
    let message = error.to_string();
    error
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message))
}

/// Scan loop feeding `tx`
///
/// Emits the ready marker once the initial scan completes, then one event per
/// changed file on every tick. Returns when the receiver is dropped.
pub(crate) async fn run(mut state: TreeState, period: Duration, tx: mpsc::Sender<ChangeEvent>) {
    let root = state.root.display().to_string();

    let mut state = match tokio::task::spawn_blocking(move || {
        let result = state.scan();
        (state, result)
    })
    .await
    {
        Ok((state, Ok(()))) => state,
        Ok((_, Err(e))) => {
            warn!("Initial scan of {} failed: {}", root, e);
            return;
        }
        Err(e) => {
            warn!("Initial scan task failed: {}", e);
            return;
        }
    };

    info!(
        "Watching {} ({} files, interval: {:?}, excluding: {})",
        root,
        state.len(),
        period,
        state.rules.describe()
    );

    if tx.send(ChangeEvent::ready()).await.is_err() {
        return;
    }

    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    timer.tick().await;

    loop {
        timer.tick().await;

        if tx.is_closed() {
            debug!("Change receiver dropped, stopping watcher");
            return;
        }

        let (next, result) = match tokio::task::spawn_blocking(move || {
            let result = state.poll();
            (state, result)
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Poll task failed: {}", e);
                return;
            }
        };
        state = next;

        match result {
            Ok(events) => {
                for event in events {
                    debug!("{} {}", event.kind, event.path().display());
                    if tx.send(event).await.is_err() {
                        debug!("Change receiver dropped, stopping watcher");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("Poll of {} failed: {}", root, e);
            }
        }
    }
}
