//! Mapping between the three path spaces
//!
//! - source space: absolute paths reported by the watcher
//! - build space: project-relative paths of compiled output
//! - graph space: `/`-separated keys used inside dependency graphs
//!
//! Every path comparison in the develop loop goes through [`PathMapper`].
//! A root that differs only by separators or a leading `./` silently breaks
//! impact detection, so roots are normalized once here.

use std::path::{Component, Path, PathBuf};

/// Translates paths between source, build and graph space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    /// Absolute project root
    project_root: PathBuf,
    /// Source root, relative to the project root
    source_root: Option<PathBuf>,
    /// Build output root, relative to the project root
    build_root: Option<PathBuf>,
}

impl PathMapper {
    pub fn new(project_root: PathBuf, source_root: Option<&str>, build_root: Option<&str>) -> Self {
        Self {
            project_root,
            source_root: source_root.and_then(normalize_root),
            build_root: build_root.and_then(normalize_root),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn has_build_step(&self) -> bool {
        self.build_root.is_some()
    }

    /// Project-relative form of `path`
    ///
    /// Paths outside the project root only lose their leading separator.
    pub fn relative(&self, path: &Path) -> PathBuf {
        let stripped = if path.is_absolute() {
            path.strip_prefix(&self.project_root).unwrap_or(path)
        } else {
            path
        };
        clean_components(stripped)
    }

    /// Absolute form of a project-relative path
    pub fn absolute(&self, path: &Path) -> PathBuf {
        self.project_root.join(path)
    }

    /// Source path to build path (project-relative)
    ///
    /// Strips the source root and re-prefixes the build root. Identity when
    /// no build step is configured.
    pub fn to_build_path(&self, source_path: &Path) -> PathBuf {
        let relative = self.relative(source_path);
        let Some(build_root) = &self.build_root else {
            return relative;
        };

        let tail = match &self.source_root {
            Some(source_root) => relative.strip_prefix(source_root).unwrap_or(&relative),
            None => relative.as_path(),
        };
        build_root.join(tail)
    }

    /// Build path to graph-space key
    pub fn to_graph_path(&self, build_path: &Path) -> String {
        let relative = self.relative(build_path);
        let stripped = match self.graph_root_relative() {
            Some(root) => relative.strip_prefix(root).unwrap_or(&relative),
            None => relative.as_path(),
        };
        render(stripped)
    }

    /// Graph-space key back to a build path (project-relative)
    pub fn from_graph_path(&self, graph_path: &str) -> PathBuf {
        let key = Path::new(graph_path.trim_start_matches('/'));
        if Path::new(graph_path).is_absolute() {
            return self.relative(Path::new(graph_path));
        }
        match self.graph_root_relative() {
            Some(root) => root.join(key),
            None => key.to_path_buf(),
        }
    }

    /// Absolute directory that graph keys are relative to
    pub fn graph_root(&self) -> PathBuf {
        match self.graph_root_relative() {
            Some(root) => self.project_root.join(root),
            None => self.project_root.clone(),
        }
    }

    fn graph_root_relative(&self) -> Option<&Path> {
        self.build_root.as_deref().or(self.source_root.as_deref())
    }
}

/// Render a relative path as a graph key (`/`-separated, no leading separator)
pub fn render(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

fn normalize_root(root: &str) -> Option<PathBuf> {
    let cleaned = clean_components(Path::new(root.trim()));
    if cleaned.as_os_str().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

pub(crate) fn clean_components(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir | Component::RootDir | Component::Prefix(_)))
        .collect()
}
