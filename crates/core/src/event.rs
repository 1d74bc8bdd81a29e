//! File system change events

use std::fmt;
use std::path::{Path, PathBuf};

/// Type of file system change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Path seen for the first time
    Added,
    /// Path content or metadata changed
    Modified,
    /// Path no longer present (or link count dropped to zero)
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "changed",
            ChangeKind::Removed => "removed",
        };
        f.write_str(label)
    }
}

/// One filesystem notification
///
/// The watcher emits a single `ready` event once the initial scan completes.
/// It carries no path and must never trigger a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: ChangeKind,
    /// Synthetic "watch ready" signal
    pub ready: bool,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            ready: false,
        }
    }

    /// The synthetic event sent after the initial tree scan
    pub fn ready() -> Self {
        Self {
            path: PathBuf::new(),
            kind: ChangeKind::Added,
            ready: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}
