//! Function descriptors and HTTP routes

use crate::config::{FunctionConfig, HttpEventConfig};
use crate::error::{DevelopError, Result};
use std::path::{Path, PathBuf};

/// One deployable unit
///
/// Immutable once loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Logical function name
    pub name: String,
    /// Handler as declared (`<module>.<exportedSymbol>`)
    pub handler: String,
    /// Compiled entry file, relative to the project root
    pub entry: PathBuf,
    /// Compiled entry file, absolute
    pub entry_abs: PathBuf,
    /// HTTP routes from the function's trigger events
    pub routes: Vec<HttpRoute>,
}

impl FunctionDescriptor {
    /// Resolve a configured function against the project root
    pub fn from_config(config: &FunctionConfig, project_root: &Path, extension: &str) -> Result<Self> {
        let (module, symbol) = config.handler.rsplit_once('.').ok_or_else(|| {
            DevelopError::config(format!(
                "function '{}': handler '{}' must look like <module>.<export>",
                config.name, config.handler
            ))
        })?;

        let module = module.trim_start_matches("./");
        if module.is_empty() || symbol.is_empty() {
            return Err(DevelopError::config(format!(
                "function '{}': handler '{}' must look like <module>.<export>",
                config.name, config.handler
            )));
        }

        let entry = PathBuf::from(format!("{}.{}", module, extension.trim_start_matches('.')));
        let routes = config
            .events
            .iter()
            .filter_map(|event| event.http.as_ref())
            .map(HttpRoute::from_config)
            .collect();

        Ok(Self {
            name: config.name.clone(),
            handler: config.handler.clone(),
            entry_abs: project_root.join(&entry),
            entry,
            routes,
        })
    }
}

/// HTTP trigger of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRoute {
    /// Upper-cased method
    pub method: String,
    /// Path as configured
    pub path: String,
}

impl HttpRoute {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
        }
    }

    fn from_config(config: &HttpEventConfig) -> Self {
        match config {
            HttpEventConfig::Detailed { method, path } => Self::new(method, path),
            HttpEventConfig::Shorthand(spec) => {
                let mut parts = spec.split_whitespace();
                let method = parts.next().unwrap_or("ANY");
                let path = parts.next().unwrap_or("/");
                Self::new(method, path)
            }
        }
    }

    /// Normalized path suffix appended to the base endpoint
    ///
    /// `/` maps to the bare base endpoint; anything else becomes `/` followed
    /// by its non-empty segments.
    pub fn normalized_path(&self) -> String {
        if self.path == "/" {
            return String::new();
        }
        let segments: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        format!("/{}", segments.join("/"))
    }

    /// External URL of this route under `base`
    pub fn url(&self, base: &str) -> String {
        format!("{}{}", base, self.normalized_path())
    }
}
