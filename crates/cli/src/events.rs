//! User-visible state transitions of the develop loop

use sdev_core::ChangeKind;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// One line worth of progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevelopEvent {
    /// Initial scan finished, watching for edits
    Ready,
    ChangeDetected { path: PathBuf, kind: ChangeKind },
    MiddlewareStarted { command: String },
    MiddlewareFinished { command: String },
    Impacted { function: String, files: Vec<PathBuf> },
    PackagingStarted { function: String },
    Packaged { function: String },
    Deployed { function: String, function_id: String },
    Endpoint { function: String, url: String },
    /// Any failure; `function` is set when the error is scoped to one function
    Error { function: Option<String>, message: String },
}

impl DevelopEvent {
    pub fn error(function: Option<&str>, message: impl fmt::Display) -> Self {
        DevelopEvent::Error {
            function: function.map(str::to_string),
            message: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DevelopEvent::Error { .. })
    }

    /// Function this event concerns, if any
    pub fn function(&self) -> Option<&str> {
        match self {
            DevelopEvent::Impacted { function, .. }
            | DevelopEvent::PackagingStarted { function }
            | DevelopEvent::Packaged { function }
            | DevelopEvent::Deployed { function, .. }
            | DevelopEvent::Endpoint { function, .. } => Some(function),
            DevelopEvent::Error { function, .. } => function.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for DevelopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevelopEvent::Ready => write!(f, "sdev develop ready!"),
            DevelopEvent::ChangeDetected { path, kind } => write!(f, "{} {}!", path.display(), kind),
            DevelopEvent::MiddlewareStarted { command } => write!(f, "Running {}...", command),
            DevelopEvent::MiddlewareFinished { command } => write!(f, "{} finished!", command),
            DevelopEvent::Impacted { function, files } => {
                let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
                write!(f, "{} impacted by {}", function, files.join(", "))
            }
            DevelopEvent::PackagingStarted { function } => write!(f, "Packaging {}...", function),
            DevelopEvent::Packaged { function } => write!(f, "Function {} packed!", function),
            DevelopEvent::Deployed { function_id, .. } => write!(f, "Function {} deployed!", function_id),
            DevelopEvent::Endpoint { url, .. } => write!(f, "Function URL: {}", url),
            DevelopEvent::Error { function: Some(function), message } => {
                write!(f, "[{}] {}", function, message)
            }
            DevelopEvent::Error { function: None, message } => write!(f, "{}", message),
        }
    }
}

/// Receiver of develop events, shared by every in-flight chain
pub type EventSink = Arc<dyn Fn(DevelopEvent) + Send + Sync>;
