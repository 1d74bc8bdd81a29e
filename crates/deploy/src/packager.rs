//! Function archives
//!
//! One archive per function at `<package_dir>/<function>.zip`. Incremental
//! packaging hands only the changed files to the archiver, which adds or
//! replaces those entries and leaves everything else in place.

use crate::process::run_program;
use async_trait::async_trait;
use sdev_core::{DevelopError, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Location of a function's archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHandle {
    pub function: String,
    /// Absolute archive path
    pub path: PathBuf,
}

/// Writes function archives
#[async_trait]
pub trait Packager: Send + Sync {
    /// Archive location for `function`, whether or not it exists yet
    fn archive_for(&self, function: &str) -> ArchiveHandle;

    /// Add or update `changed_files` (project-relative) in the function's
    /// archive, creating it if absent
    async fn package(&self, function: &str, changed_files: &[PathBuf]) -> Result<ArchiveHandle>;

    /// Rebuild the function's archive from scratch with `files`
    async fn package_full(&self, function: &str, files: &[PathBuf]) -> Result<ArchiveHandle>;
}

/// Packager driving an external `zip`-compatible archiver
///
/// The archiver is invoked as `<command...> <archive> <files...>` from the
/// project root, so entries keep their project-relative paths.
#[derive(Debug, Clone)]
pub struct ZipPackager {
    project_root: PathBuf,
    package_dir: PathBuf,
    program: String,
    base_args: Vec<String>,
    verbose: bool,
}

impl ZipPackager {
    pub fn new(project_root: &Path, package_dir: &Path, archive_command: &str, verbose: bool) -> Result<Self> {
        let mut parts = archive_command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| DevelopError::config("archive command is empty"))?;

        Ok(Self {
            project_root: project_root.to_path_buf(),
            package_dir: package_dir.to_path_buf(),
            program,
            base_args: parts.collect(),
            verbose,
        })
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    async fn run_archiver(&self, archive: &ArchiveHandle, files: &[PathBuf]) -> Result<()> {
        tokio::fs::create_dir_all(&self.package_dir).await?;

        let mut args: Vec<std::ffi::OsString> = self.base_args.iter().map(Into::into).collect();
        args.push(archive.path.clone().into_os_string());
        args.extend(files.iter().map(|f| f.clone().into_os_string()));

        debug!(
            "Packaging {} ({} files) into {}",
            archive.function,
            files.len(),
            archive.path.display()
        );

        let result = run_program(&self.program, args, &self.project_root, None)
            .await
            .map_err(|e| DevelopError::Packaging {
                function: archive.function.clone(),
                exit_code: None,
                stderr: format!("cannot run `{}`: {}", self.program, e),
            })?;

        if self.verbose && !result.stdout.trim().is_empty() {
            info!("[{}] {}", self.program, result.stdout.trim_end());
        }

        if !result.success() {
            return Err(DevelopError::Packaging {
                function: archive.function.clone(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Packager for ZipPackager {
    fn archive_for(&self, function: &str) -> ArchiveHandle {
        ArchiveHandle {
            function: function.to_string(),
            path: self.package_dir.join(format!("{}.zip", function)),
        }
    }

    async fn package(&self, function: &str, changed_files: &[PathBuf]) -> Result<ArchiveHandle> {
        let archive = self.archive_for(function);
        if changed_files.is_empty() {
            return Ok(archive);
        }
        self.run_archiver(&archive, changed_files).await?;
        Ok(archive)
    }

    async fn package_full(&self, function: &str, files: &[PathBuf]) -> Result<ArchiveHandle> {
        let archive = self.archive_for(function);
        match tokio::fs::remove_file(&archive.path).await {
            Ok(()) => debug!("Removed stale archive {}", archive.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.run_archiver(&archive, files).await?;
        Ok(archive)
    }
}
