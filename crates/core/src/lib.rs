//! Core model for the sdev develop loop
//!
//! This crate provides:
//! - Validated project configuration (`sdev.toml`)
//! - Function descriptors and HTTP route composition
//! - Path mapping between source, build and graph path spaces
//! - Import extraction and static dependency graphs for function entry files
//! - Impact resolution (which functions a changed file affects)

pub mod config;
pub mod error;
pub mod event;
pub mod function;
pub mod graph;
pub mod impact;
pub mod imports;
pub mod pathmap;

// Re-exports
pub use config::DevelopConfig;
pub use error::{DevelopError, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use function::{FunctionDescriptor, HttpRoute};
pub use graph::{DependencyGraph, GraphBuilder};
pub use impact::{ImpactReason, ImpactResolver, ImpactSet, ImpactedFunction};
pub use imports::scan_imports;
pub use pathmap::PathMapper;
