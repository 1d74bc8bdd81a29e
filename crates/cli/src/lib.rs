//! sdev CLI library
//!
//! The develop loop lives here so the binary stays a thin clap front-end and
//! integration tests can drive the orchestrator with fake collaborators.

pub mod events;
pub mod orchestrator;
pub mod session;
pub mod ui;

pub use events::{DevelopEvent, EventSink};
pub use orchestrator::{LoopState, Orchestrator, PrepareSummary};
pub use session::Session;
