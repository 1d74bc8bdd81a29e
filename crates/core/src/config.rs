//! Project configuration (`sdev.toml`)
//!
//! Loaded and validated once at startup. Optional fields resolve to their
//! defaults here so components never re-check them.

use crate::error::{DevelopError, Result};
use crate::function::FunctionDescriptor;
use crate::pathmap::{clean_components, render, PathMapper};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name
pub const CONFIG_FILE: &str = "sdev.toml";

/// Validated project configuration
#[derive(Debug, Clone)]
pub struct DevelopConfig {
    /// Directory containing the configuration file
    pub project_root: PathBuf,
    pub service: ServiceConfig,
    pub develop: DevelopSettings,
    /// Functions in declaration order
    pub functions: Vec<FunctionConfig>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    service: ServiceConfig,
    #[serde(default)]
    develop: DevelopSettings,
    #[serde(default)]
    functions: Vec<FunctionConfig>,
}

/// `[service]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name (prefix of every remote function id)
    pub name: String,

    /// Deployment stage (default: dev)
    #[serde(default = "default_stage")]
    pub stage: String,

    /// Remote region (default: us-east-1)
    #[serde(default = "default_region")]
    pub region: String,

    /// Credentials profile for the remote platform
    #[serde(default)]
    pub profile: Option<String>,
}

/// `[develop]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevelopSettings {
    /// Build output root, relative to the project root
    #[serde(default)]
    pub build_path: Option<String>,

    /// Watched source root, relative to the project root
    #[serde(default)]
    pub source_path: Option<String>,

    /// Poll interval in seconds (default: 0.1)
    #[serde(default = "default_change_interval")]
    pub change_interval: f64,

    #[serde(default)]
    pub verbose: bool,

    /// Shell commands run before every change cycle, in order
    #[serde(default)]
    pub middleware: Vec<String>,

    /// Directory holding one archive per function (default: .serverless)
    #[serde(default = "default_package_path")]
    pub package_path: String,

    /// Archiver program invoked as `<program> <archive> <files...>` (default: zip -r)
    ///
    /// Must recurse into directories so runtime dependencies are archived.
    #[serde(default = "default_archive_command")]
    pub archive_command: String,

    /// Runtime dependency directories shipped in every initial archive,
    /// relative to the project root (default: node_modules)
    #[serde(default = "default_runtime_paths")]
    pub runtime_paths: Vec<String>,

    /// Extension of compiled entry files (default: js)
    #[serde(default = "default_entry_extension")]
    pub entry_extension: String,

    /// Extra path fragments excluded from watching
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for DevelopSettings {
    fn default() -> Self {
        Self {
            build_path: None,
            source_path: None,
            change_interval: default_change_interval(),
            verbose: false,
            middleware: vec![],
            package_path: default_package_path(),
            archive_command: default_archive_command(),
            runtime_paths: default_runtime_paths(),
            entry_extension: default_entry_extension(),
            exclude: vec![],
        }
    }
}

/// `[[functions]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub name: String,

    /// `<module>.<exportedSymbol>`, e.g. `build/handler.hello`
    pub handler: String,

    #[serde(default)]
    pub events: Vec<EventConfig>,
}

/// Trigger event; only `http` triggers are interpreted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default)]
    pub http: Option<HttpEventConfig>,
}

/// Either `"GET hello"` or `{ method = "get", path = "hello" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HttpEventConfig {
    Shorthand(String),
    Detailed { method: String, path: String },
}

impl DevelopConfig {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DevelopError::config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let project_root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        let project_root = project_root.canonicalize().unwrap_or(project_root);

        Self::from_toml_str(&content, project_root)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str, project_root: PathBuf) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| DevelopError::config(format!("invalid {}: {}", CONFIG_FILE, e)))?;

        let config = Self {
            project_root,
            service: raw.service,
            develop: raw.develop,
            functions: raw.functions,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            return Err(DevelopError::config("service.name must not be empty"));
        }

        if !(self.develop.change_interval > 0.0 && self.develop.change_interval.is_finite()) {
            return Err(DevelopError::config(format!(
                "develop.change_interval must be a positive number of seconds (got {})",
                self.develop.change_interval
            )));
        }

        if self.develop.archive_command.trim().is_empty() {
            return Err(DevelopError::config("develop.archive_command must not be empty"));
        }

        if self.functions.is_empty() {
            return Err(DevelopError::config("no functions declared"));
        }

        let mut seen = HashSet::new();
        for function in &self.functions {
            if !seen.insert(function.name.as_str()) {
                return Err(DevelopError::config(format!(
                    "function '{}' declared more than once",
                    function.name
                )));
            }
            // Surfaces malformed handlers at load time
            FunctionDescriptor::from_config(function, &self.project_root, &self.develop.entry_extension)?;
        }

        Ok(())
    }

    /// Function descriptors in declaration order
    pub fn descriptors(&self) -> Result<Vec<FunctionDescriptor>> {
        self.functions
            .iter()
            .map(|f| FunctionDescriptor::from_config(f, &self.project_root, &self.develop.entry_extension))
            .collect()
    }

    pub fn mapper(&self) -> PathMapper {
        PathMapper::new(
            self.project_root.clone(),
            self.develop.source_path.as_deref(),
            self.develop.build_path.as_deref(),
        )
    }

    pub fn change_interval(&self) -> Duration {
        Duration::from_secs_f64(self.develop.change_interval)
    }

    /// Absolute root of the watched tree
    pub fn watch_root(&self) -> PathBuf {
        match non_empty(self.develop.source_path.as_deref()) {
            Some(source) => self.project_root.join(source),
            None => self.project_root.clone(),
        }
    }

    /// Directory holding function archives
    pub fn package_dir(&self) -> PathBuf {
        self.project_root.join(&self.develop.package_path)
    }

    /// Exclusion patterns the watcher never reports
    ///
    /// Gitignore-style lines relative to the watch root. The build and
    /// archive directories are anchored (`/build`) and dropped when they lie
    /// outside the watched tree.
    pub fn exclude_patterns(&self) -> Vec<String> {
        let mut patterns = vec!["node_modules".to_string()];
        let watch_root = clean_components(Path::new(
            non_empty(self.develop.source_path.as_deref()).unwrap_or(""),
        ));

        let owned = [
            non_empty(self.develop.build_path.as_deref()),
            non_empty(Some(self.develop.package_path.as_str())),
        ];
        for dir in owned.into_iter().flatten() {
            if let Some(anchored) = anchored_under(&watch_root, dir) {
                if !patterns.contains(&anchored) {
                    patterns.push(anchored);
                }
            }
        }

        patterns.extend(
            self.develop
                .exclude
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        );
        patterns
    }

    /// Runtime dependency directories that exist, project-relative
    pub fn runtime_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for raw in &self.develop.runtime_paths {
            let cleaned = clean_components(Path::new(raw.trim()));
            if cleaned.as_os_str().is_empty() || paths.contains(&cleaned) {
                continue;
            }
            if self.project_root.join(&cleaned).exists() {
                paths.push(cleaned);
            }
        }
        paths
    }

    /// Remote stack name (`<service>-<stage>`)
    pub fn stack_name(&self) -> String {
        format!("{}-{}", self.service.name, self.service.stage)
    }
}

/// `/<dir>` relative to `watch_root`, or None when `dir` is not strictly inside it
fn anchored_under(watch_root: &Path, dir: &str) -> Option<String> {
    let cleaned = clean_components(Path::new(dir));
    let inside = cleaned.strip_prefix(watch_root).ok()?;
    let rendered = render(inside);
    if rendered.is_empty() || rendered.starts_with("..") {
        return None;
    }
    Some(format!("/{}", rendered))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty() && *v != ".")
}

fn default_stage() -> String {
    "dev".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_change_interval() -> f64 {
    0.1
}

fn default_package_path() -> String {
    ".serverless".to_string()
}

fn default_archive_command() -> String {
    "zip -r".to_string()
}

fn default_runtime_paths() -> Vec<String> {
    vec!["node_modules".to_string()]
}

fn default_entry_extension() -> String {
    "js".to_string()
}

/// Example configuration printed by `sdev init`-style help
pub fn example_config() -> &'static str {
    r#"[service]
name = "my-service"
stage = "dev"
region = "us-east-1"

[develop]
source_path = "src"
build_path = "build"
change_interval = 0.1
verbose = false
middleware = ["npx babel src -d build"]

[[functions]]
name = "hello"
handler = "build/handler.hello"
events = [{ http = "GET hello" }]
"#
}
