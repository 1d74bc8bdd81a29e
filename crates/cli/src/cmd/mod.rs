//! CLI command implementations

pub mod develop;
pub mod graph;
pub mod init;
pub mod package;
