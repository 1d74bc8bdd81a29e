//! Workflow integration tests
//!
//! Drive the orchestrator end to end against real projects on disk, with
//! recording fakes standing in for the archiver and the remote platform.

pub mod bootstrap;
pub mod develop_cycle;
