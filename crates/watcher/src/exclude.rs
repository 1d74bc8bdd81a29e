//! Exclusion rules for the watched tree
//!
//! Sources of exclusion, checked in order:
//! 1. Hidden files and directories (optional, enabled by default)
//! 2. Editor temporary files (always)
//! 3. Configured patterns (`node_modules`, `/build`, `*.log`, ...)
//!
//! Patterns are gitignore lines relative to the watched root. A pattern
//! without a slash matches at any depth, a leading `/` anchors it to the
//! root, and a matching directory excludes everything below it.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use sdev_core::{DevelopError, Result};
use std::path::{Component, Path, PathBuf};

/// Exclusion rule set for one watched root
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    /// Watched root directory
    root: PathBuf,

    /// Compiled configured patterns
    patterns: Gitignore,

    /// Pattern lines as configured, for logging
    lines: Vec<String>,

    /// Skip dot-files and dot-directories
    ignore_hidden: bool,
}

impl IgnoreRules {
    /// Build rules for `root`
    pub fn new(root: &Path, patterns: &[String], ignore_hidden: bool) -> Result<Self> {
        let lines: Vec<String> = patterns
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let mut builder = GitignoreBuilder::new(root);
        for line in &lines {
            builder.add_line(None, line).map_err(|e| {
                DevelopError::config(format!("invalid exclude pattern '{}': {}", line, e))
            })?;
        }
        let patterns = builder
            .build()
            .map_err(|e| DevelopError::config(format!("invalid exclude patterns: {}", e)))?;

        Ok(Self {
            root: root.to_path_buf(),
            patterns,
            lines,
            ignore_hidden,
        })
    }

    /// Check if path should be excluded
    ///
    /// Accepts absolute paths under the root or paths relative to it. The
    /// root itself and paths outside it are never excluded.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.has_root() || render(relative).is_empty() {
            return false;
        }

        if self.ignore_hidden && is_hidden(relative) {
            return true;
        }

        if matches_editor_temp(relative) {
            return true;
        }

        let is_dir = self.root.join(relative).is_dir();
        self.patterns
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
    }

    /// Configured patterns, as `a|b|c` for logging
    pub fn describe(&self) -> String {
        self.lines.join("|")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn render(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(part) => part.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Vim swap files, Emacs backups and lock files, OS metadata files
fn matches_editor_temp(relative: &Path) -> bool {
    let filename = relative
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    filename.ends_with(".swp")
        || filename.ends_with(".swo")
        || filename.ends_with(".swx")
        || filename.ends_with('~')
        || (filename.starts_with('#') && filename.ends_with('#'))
        || filename.starts_with(".#")
        || filename == ".DS_Store"
        || filename == "Thumbs.db"
        || filename == "4913"
}
