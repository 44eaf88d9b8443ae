//! External decompression subprocesses as scoped resources
//!
//! Some deployments decompress through external tools (`zcat`, `pigz -dc`)
//! to offload CPU. The child is always waited on: explicitly via
//! [`DecompressProcess::finish`] with a bounded timeout, or killed on drop
//! if an error path abandons it. Child stderr is captured and surfaced on
//! any failure.

use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::PipelineError;
use crate::source::ensure_exists;

/// Bounded wait after the input side is closed.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A spawned decompression child with piped stdout/stderr.
pub struct DecompressProcess {
    child: Option<Child>,
    command: String,
}

impl DecompressProcess {
    /// Spawn `program <path>` with piped stdout and stderr.
    ///
    /// The input path is validated first so a missing file is reported as
    /// `MissingInput` rather than as a cryptic child failure.
    pub fn spawn(program: &str, path: &Path) -> Result<Self, PipelineError> {
        ensure_exists(path)?;
        let command = format!("{program} {}", path.display());
        let child = Command::new(program)
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PipelineError::Subprocess {
                command: command.clone(),
                detail: format!("failed to spawn: {e}"),
                stderr: String::new(),
            })?;
        Ok(Self {
            child: Some(child),
            command,
        })
    }

    /// Take the child's stdout pipe. Panics if taken twice.
    pub fn stdout(&mut self) -> ChildStdout {
        self.child
            .as_mut()
            .and_then(|c| c.stdout.take())
            .expect("stdout already taken")
    }

    /// Wait for the child with a bounded timeout, then check its status.
    ///
    /// Call after the stdout side has been drained or dropped. Timeout and
    /// non-zero exit both surface the captured stderr.
    pub fn finish(mut self, timeout: Duration) -> Result<(), PipelineError> {
        let mut child = self.child.take().expect("child already finished");
        let deadline = Instant::now() + timeout;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if status.success() {
                        return Ok(());
                    }
                    return Err(PipelineError::Subprocess {
                        command: self.command.clone(),
                        detail: format!("exited with {status}"),
                        stderr: read_stderr(&mut child),
                    });
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        // kill before draining stderr, a live child keeps
                        // the pipe open and the read would block
                        let _ = child.kill();
                        let stderr = read_stderr(&mut child);
                        let _ = child.wait();
                        return Err(PipelineError::Subprocess {
                            command: self.command.clone(),
                            detail: format!("timed out after {}s", timeout.as_secs()),
                            stderr,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PipelineError::Io(e));
                }
            }
        }
    }
}

impl Drop for DecompressProcess {
    fn drop(&mut self) {
        // abandoned on an error path: don't leave the child running
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn read_stderr(child: &mut Child) -> String {
    let mut buf = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut buf);
    }
    buf.trim_end().to_string()
}
