//! Error taxonomy for the develop loop
//!
//! Errors scoped to one function (`GraphBuild`, `Packaging`, `Deployment`)
//! never end the watch loop. `Middleware` ends the current change cycle and
//! `Configuration` aborts before watching starts.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sdev operations
pub type Result<T> = std::result::Result<T, DevelopError>;

/// Main error type for sdev operations
#[derive(Error, Debug)]
pub enum DevelopError {
    /// Unusable watch root, invalid or missing configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A function's source tree could not be analyzed
    #[error("cannot build dependency graph for {}: {reason}", .entry.display())]
    GraphBuild { entry: PathBuf, reason: String },

    /// A pre-build command exited non-zero (or could not be started)
    #[error("middleware `{command}` failed ({})", describe_exit(.exit_code))]
    Middleware {
        command: String,
        exit_code: Option<i32>,
    },

    /// The archiver process failed for one function
    #[error("packaging {function} failed ({}): {stderr}", describe_exit(.exit_code))]
    Packaging {
        function: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The remote platform rejected a function's code
    #[error("deploying {function} failed: {message}")]
    Deployment { function: String, message: String },

    /// A remote platform request failed outside of a function deploy
    #[error("{operation} request failed: {message}")]
    Platform { operation: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DevelopError {
    /// Name of the function this error is scoped to, if any
    pub fn function(&self) -> Option<&str> {
        match self {
            DevelopError::Packaging { function, .. } | DevelopError::Deployment { function, .. } => {
                Some(function)
            }
            _ => None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        DevelopError::Configuration(message.into())
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated without exit code".to_string(),
    }
}
