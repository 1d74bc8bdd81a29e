//! Throwaway projects on disk

use cli_lib::Session;
use sdev_core::{ChangeEvent, ChangeKind, DevelopConfig};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Project with two functions, `api` and `other`
///
/// ```text
/// handlers/api.js    -> ../services/wait.js
/// handlers/other.js
/// services/wait.js   -> ./clock.js
/// services/clock.js
/// ```
pub struct TestProject {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let project = Self {
            _temp_dir: temp_dir,
            root,
        };
        project.write(
            "handlers/api.js",
            "const wait = require('../services/wait');\nexports.main = async () => wait(10);\n",
        );
        project.write("handlers/other.js", "exports.main = async () => 'other';\n");
        project.write(
            "services/wait.js",
            "import { now } from './clock.js';\nexport default (ms) => now() + ms;\n",
        );
        project.write("services/clock.js", "export const now = () => Date.now();\n");
        project
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Executable shell script at `relative`
    pub fn script(&self, relative: &str, body: &str) {
        self.write(relative, &format!("#!/bin/sh\n{}\n", body));
        fs::set_permissions(self.root.join(relative), fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    /// Session for the two-function project plus `middleware`
    pub fn session(&self, middleware: &[&str]) -> Arc<Session> {
        let middleware: Vec<String> = middleware.iter().map(|c| format!("{:?}", c)).collect();
        let config = format!(
            r#"
[service]
name = "svc"

[develop]
middleware = [{}]

[[functions]]
name = "api"
handler = "handlers/api.main"
events = [{{ http = "GET api/wait" }}]

[[functions]]
name = "other"
handler = "handlers/other.main"
"#,
            middleware.join(", ")
        );
        let config = DevelopConfig::from_toml_str(&config, self.root.clone()).unwrap();
        Arc::new(Session::new(config).unwrap())
    }

    pub fn modified(&self, relative: &str) -> ChangeEvent {
        ChangeEvent::new(self.root.join(relative), ChangeKind::Modified)
    }
}
