//! Common utilities for integration tests

pub mod fakes;
pub mod fixtures;

// Re-export commonly used items
pub use fakes::{EventLog, RecordingPackager, RecordingPlatform};
pub use fixtures::TestProject;
