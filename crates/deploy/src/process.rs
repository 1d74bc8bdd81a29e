//! Spawned process results
//!
//! Every external command (middleware, archiver, platform CLI) goes through
//! here and is awaited to completion; output is captured, never streamed.

use bytes::Bytes;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Outcome of one finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn from_output(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Run `command` through `sh -c` in `cwd`
pub async fn run_shell(command: &str, cwd: &Path) -> io::Result<ProcessResult> {
    debug!("$ {}", command);
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;
    Ok(ProcessResult::from_output(output))
}

/// Run `program` with `args` in `cwd`, optionally feeding `stdin`
pub async fn run_program<I, S>(
    program: &str,
    args: I,
    cwd: &Path,
    stdin: Option<Bytes>,
) -> io::Result<ProcessResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let Some(input) = stdin else {
        command.stdin(Stdio::null());
        let output = command.output().await?;
        return Ok(ProcessResult::from_output(output));
    };

    command.stdin(Stdio::piped());
    let mut child = command.spawn()?;

    // Feed stdin concurrently so a child that fills its stdout pipe before
    // reading all input cannot deadlock us
    let writer = child.stdin.take().map(|mut pipe| {
        tokio::spawn(async move {
            let result = pipe.write_all(&input).await;
            drop(pipe);
            result
        })
    });

    let output = child.wait_with_output().await?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            // The child may legitimately exit without reading everything
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }

    Ok(ProcessResult::from_output(output))
}
