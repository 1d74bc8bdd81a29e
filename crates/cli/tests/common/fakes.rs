//! Recording stand-ins for the archiver and the remote platform

use async_trait::async_trait;
use bytes::Bytes;
use cli_lib::{DevelopEvent, EventSink};
use deploy::{ArchiveHandle, Packager, Platform};
use parking_lot::Mutex;
use sdev_core::{DevelopError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// Collects every emitted event
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<DevelopEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> EventSink {
        let events = self.events.clone();
        Arc::new(move |event| events.lock().push(event))
    }

    pub fn events(&self) -> Vec<DevelopEvent> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> Vec<DevelopEvent> {
        self.events().into_iter().filter(|e| e.is_error()).collect()
    }

    pub fn contains(&self, event: &DevelopEvent) -> bool {
        self.events.lock().contains(event)
    }

    /// Events concerning `function`, in emission order
    pub fn for_function(&self, function: &str) -> Vec<DevelopEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.function() == Some(function))
            .collect()
    }
}

/// One packager invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCall {
    pub function: String,
    pub files: Vec<PathBuf>,
    pub full: bool,
}

/// Packager writing a text "archive" listing the files it was given
pub struct RecordingPackager {
    package_dir: PathBuf,
    calls: Mutex<Vec<PackageCall>>,
    journal: Mutex<Vec<String>>,
    delay: Duration,
    barrier: Option<Barrier>,
    failing: Option<String>,
}

impl RecordingPackager {
    pub fn new(project_root: &Path) -> Self {
        Self {
            package_dir: project_root.join(".serverless"),
            calls: Mutex::new(Vec::new()),
            journal: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            barrier: None,
            failing: None,
        }
    }

    /// Hold every incremental package call for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Incremental package calls only return once `n` of them are in flight
    pub fn with_barrier(mut self, n: usize) -> Self {
        self.barrier = Some(Barrier::new(n));
        self
    }

    /// Fail every call for `function`
    pub fn failing(mut self, function: &str) -> Self {
        self.failing = Some(function.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PackageCall> {
        self.calls.lock().clone()
    }

    /// `start:<fn>` / `end:<fn>` markers in the order they happened
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    fn write_archive(&self, archive: &ArchiveHandle, files: &[PathBuf], full: bool) {
        std::fs::create_dir_all(&self.package_dir).unwrap();
        let mut listing = if full {
            String::new()
        } else {
            std::fs::read_to_string(&archive.path).unwrap_or_default()
        };
        for file in files {
            listing.push_str(&format!("{}\n", file.display()));
        }
        std::fs::write(&archive.path, listing).unwrap();
    }

    fn record(&self, function: &str, files: &[PathBuf], full: bool) -> Result<ArchiveHandle> {
        self.calls.lock().push(PackageCall {
            function: function.to_string(),
            files: files.to_vec(),
            full,
        });

        if self.failing.as_deref() == Some(function) {
            return Err(DevelopError::Packaging {
                function: function.to_string(),
                exit_code: Some(12),
                stderr: "zip error: Nothing to do!".to_string(),
            });
        }

        let archive = self.archive_for(function);
        self.write_archive(&archive, files, full);
        Ok(archive)
    }
}

#[async_trait]
impl Packager for RecordingPackager {
    fn archive_for(&self, function: &str) -> ArchiveHandle {
        ArchiveHandle {
            function: function.to_string(),
            path: self.package_dir.join(format!("{}.zip", function)),
        }
    }

    async fn package(&self, function: &str, changed_files: &[PathBuf]) -> Result<ArchiveHandle> {
        self.journal.lock().push(format!("start:{}", function));
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.record(function, changed_files, false);
        self.journal.lock().push(format!("end:{}", function));
        result
    }

    async fn package_full(&self, function: &str, files: &[PathBuf]) -> Result<ArchiveHandle> {
        self.record(function, files, true)
    }
}

/// Platform recording code replacements
#[derive(Default)]
pub struct RecordingPlatform {
    outputs: HashMap<String, String>,
    rejecting: Option<String>,
    describe_calls: Mutex<Vec<String>>,
    replaced: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, url: &str) -> Self {
        self.outputs
            .insert("ServiceEndpoint".to_string(), url.to_string());
        self
    }

    /// Reject code replacement for `function_id`
    pub fn rejecting(mut self, function_id: &str) -> Self {
        self.rejecting = Some(function_id.to_string());
        self
    }

    pub fn describe_calls(&self) -> Vec<String> {
        self.describe_calls.lock().clone()
    }

    pub fn replaced(&self) -> Vec<(String, Vec<u8>)> {
        self.replaced.lock().clone()
    }

    pub fn replaced_ids(&self) -> Vec<String> {
        self.replaced.lock().iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn describe_stack_outputs(&self, stack: &str) -> Result<HashMap<String, String>> {
        self.describe_calls.lock().push(stack.to_string());
        Ok(self.outputs.clone())
    }

    async fn replace_function_code(&self, function_id: &str, code: Bytes) -> Result<()> {
        if self.rejecting.as_deref() == Some(function_id) {
            return Err(DevelopError::Platform {
                operation: "update-function-code".to_string(),
                message: format!("Function not found: {}", function_id),
            });
        }
        self.replaced
            .lock()
            .push((function_id.to_string(), code.to_vec()));
        Ok(())
    }
}
