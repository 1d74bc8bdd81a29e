//! Impact resolution
//!
//! Decides which functions a changed file affects. A function is impacted
//! when the changed file maps to its compiled entry file, or when the mapped
//! file appears in the dependency closure recorded for its entry.

use crate::event::ChangeEvent;
use crate::function::FunctionDescriptor;
use crate::graph::DependencyGraph;
use crate::pathmap::PathMapper;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Why a function was included in an impact set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactReason {
    /// The changed file is the function's entry file
    EntryChanged,
    /// The changed file is one of the entry's dependencies
    Dependency,
}

/// One impacted function and the files to repackage for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactedFunction {
    pub function: FunctionDescriptor,
    /// Build-space paths (project-relative) to add to the archive
    pub changed_files: Vec<PathBuf>,
    pub reason: ImpactReason,
}

/// Functions impacted by one change event, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImpactSet {
    items: Vec<ImpactedFunction>,
}

impl ImpactSet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImpactedFunction> {
        self.items.iter()
    }

    /// Impacted function names, in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.function.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ImpactedFunction> {
        self.items.iter().find(|i| i.function.name == name)
    }
}

impl IntoIterator for ImpactSet {
    type Item = ImpactedFunction;
    type IntoIter = std::vec::IntoIter<ImpactedFunction>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Resolves change events to impact sets
#[derive(Debug, Clone)]
pub struct ImpactResolver {
    mapper: PathMapper,
}

impl ImpactResolver {
    pub fn new(mapper: PathMapper) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// True when `change` is the function's own entry file
    pub fn entry_changed(&self, change: &ChangeEvent, function: &FunctionDescriptor) -> bool {
        !change.is_ready() && self.mapper.to_build_path(change.path()) == self.entry_path(function)
    }

    /// True when resolving `change` for `function` requires its graph
    pub fn needs_graph(&self, change: &ChangeEvent, function: &FunctionDescriptor) -> bool {
        !change.is_ready() && !self.entry_changed(change, function)
    }

    /// Graph-space key of a function's entry file
    pub fn entry_key(&self, function: &FunctionDescriptor) -> String {
        self.mapper.to_graph_path(&self.entry_path(function))
    }

    /// Compute the impact set of `change`
    ///
    /// `graphs` is keyed by function name. A function without a graph (its
    /// build failed) simply does not match; it never blocks the others.
    pub fn resolve(
        &self,
        change: &ChangeEvent,
        functions: &[FunctionDescriptor],
        graphs: &HashMap<String, DependencyGraph>,
    ) -> ImpactSet {
        if change.is_ready() {
            return ImpactSet::default();
        }

        let changed_build = self.mapper.to_build_path(change.path());
        let changed_key = self.mapper.to_graph_path(&changed_build);

        let items = functions
            .iter()
            .filter_map(|function| {
                let entry = self.entry_path(function);
                if changed_build == entry {
                    return Some(ImpactedFunction {
                        function: function.clone(),
                        changed_files: vec![entry],
                        reason: ImpactReason::EntryChanged,
                    });
                }

                let deps = graphs
                    .get(&function.name)
                    .and_then(|graph| graph.dependencies(&self.entry_key(function)))?;

                deps.iter()
                    .any(|dep| matches_dependency(&changed_key, dep))
                    .then(|| ImpactedFunction {
                        function: function.clone(),
                        changed_files: vec![changed_build.clone()],
                        reason: ImpactReason::Dependency,
                    })
            })
            .collect();

        ImpactSet { items }
    }

    fn entry_path(&self, function: &FunctionDescriptor) -> PathBuf {
        self.mapper.relative(&function.entry)
    }
}

/// Element match, or the dependency is a trailing component run of the key
fn matches_dependency(changed_key: &str, dependency: &str) -> bool {
    !dependency.is_empty()
        && (changed_key == dependency || Path::new(changed_key).ends_with(Path::new(dependency)))
}
