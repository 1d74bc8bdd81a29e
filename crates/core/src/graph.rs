//! Static dependency graphs for function entry files
//!
//! The builder follows every local `require`/`import` reachable from an entry
//! file. Bare specifiers (packages) and anything under `node_modules` are
//! external and never enter the graph.
//!
//! Keys and values are graph-space paths: relative to the graph root,
//! `/`-separated, no leading separator. Each node maps to its full
//! transitive closure, so consumers only ever look one level deep.

use crate::error::{DevelopError, Result};
use crate::imports::scan_imports;
use crate::pathmap::render;
use path_clean::PathClean;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions probed when a specifier omits one
const PROBE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "json", "ts"];

/// Extensions whose contents are parsed for imports
const SCANNED_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx"];

/// Directories whose modules are never part of a graph
const EXTERNAL_DIRS: &[&str] = &["node_modules"];

/// Dependency graph of one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    /// Graph-space key of the entry file
    entry: String,
    /// Direct imports per file
    imports: BTreeMap<String, Vec<String>>,
    /// Transitive dependencies per file
    closure: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build a graph from direct import edges
    pub fn from_imports(entry: impl Into<String>, imports: BTreeMap<String, Vec<String>>) -> Self {
        let closure = imports
            .keys()
            .map(|key| (key.clone(), transitive(&imports, key)))
            .collect();

        Self {
            entry: entry.into(),
            imports,
            closure,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Every file reachable from `key`, in discovery order
    pub fn dependencies(&self, key: &str) -> Option<&[String]> {
        self.closure.get(key).map(Vec::as_slice)
    }

    /// Files `key` imports directly
    pub fn imports(&self, key: &str) -> Option<&[String]> {
        self.imports.get(key).map(Vec::as_slice)
    }

    /// All files in the graph, sorted
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.imports.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    /// Direct import tree as pretty JSON (for verbose output)
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.imports).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Depth-first closure of `start`, excluding `start` itself
fn transitive(imports: &BTreeMap<String, Vec<String>>, start: &str) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<&str> = imports
        .get(start)
        .map(|deps| deps.iter().rev().map(String::as_str).collect())
        .unwrap_or_default();
    seen.insert(start);

    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        order.push(node.to_string());
        if let Some(deps) = imports.get(node) {
            stack.extend(deps.iter().rev().map(String::as_str));
        }
    }

    order
}

/// Outcome of resolving one import specifier
#[derive(Debug, PartialEq, Eq)]
enum Resolution {
    Local(PathBuf),
    External,
    Missing,
}

/// Builds dependency graphs rooted at function entry files
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    /// Absolute directory graph keys are relative to
    root: PathBuf,
}

impl GraphBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the full graph for `entry` (absolute path)
    ///
    /// Fails if the entry or any local import cannot be read, parsed or
    /// resolved.
    pub fn build(&self, entry: &Path) -> Result<DependencyGraph> {
        if !entry.is_file() {
            return Err(graph_error(entry, "entry file not found"));
        }

        let entry = entry.to_path_buf().clean();
        let entry_key = self.key(&entry);

        let mut imports: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut pending = vec![entry.clone()];

        while let Some(file) = pending.pop() {
            if !visited.insert(file.clone()) {
                continue;
            }

            let mut deps = Vec::new();
            if is_scanned(&file) {
                let source = std::fs::read_to_string(&file).map_err(|e| {
                    graph_error(&entry, &format!("cannot read {}: {}", file.display(), e))
                })?;

                let specifiers = scan_imports(&file, &source).map_err(|reason| {
                    graph_error(&entry, &format!("cannot parse {}: {}", file.display(), reason))
                })?;

                for specifier in specifiers {
                    match resolve(&file, &specifier) {
                        Resolution::Local(target) => {
                            let key = self.key(&target);
                            if !deps.contains(&key) {
                                deps.push(key);
                            }
                            pending.push(target);
                        }
                        Resolution::External => {}
                        Resolution::Missing => {
                            return Err(graph_error(
                                &entry,
                                &format!("cannot resolve '{}' from {}", specifier, file.display()),
                            ));
                        }
                    }
                }
            }

            imports.insert(self.key(&file), deps);
        }

        debug!("Dependency graph for {}: {} files", entry_key, imports.len());
        Ok(DependencyGraph::from_imports(entry_key, imports))
    }

    /// Graph-space key for an absolute path
    fn key(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) => render(relative),
            Err(_) => path.to_string_lossy().replace('\\', "/"),
        }
    }
}

fn graph_error(entry: &Path, reason: &str) -> DevelopError {
    DevelopError::GraphBuild {
        entry: entry.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn is_scanned(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SCANNED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

fn is_external(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|name| EXTERNAL_DIRS.contains(&name))
            .unwrap_or(false)
    })
}

/// Resolve `specifier` as imported from `from`
fn resolve(from: &Path, specifier: &str) -> Resolution {
    let is_local = specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/');
    if !is_local {
        return Resolution::External;
    }

    let base = if specifier.starts_with('/') {
        PathBuf::from(specifier)
    } else {
        from.parent().unwrap_or(Path::new("")).join(specifier)
    };
    let base = base.clean();

    let mut candidates = vec![base.clone()];
    for ext in PROBE_EXTENSIONS {
        let mut with_ext = base.clone().into_os_string();
        with_ext.push(".");
        with_ext.push(ext);
        candidates.push(PathBuf::from(with_ext));
    }
    for ext in PROBE_EXTENSIONS {
        candidates.push(base.join(format!("index.{}", ext)));
    }

    match candidates.into_iter().find(|c| c.is_file()) {
        Some(found) if is_external(&found) => Resolution::External,
        Some(found) => Resolution::Local(found),
        None if is_external(&base) => Resolution::External,
        None => Resolution::Missing,
    }
}
