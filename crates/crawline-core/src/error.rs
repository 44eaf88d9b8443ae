//! Common error type for sharding pipeline runs

use std::path::PathBuf;

use crate::decode::DecodeError;

/// Error that aborts a pipeline run.
///
/// Recoverable per-record problems ([`DecodeError`] variants other than
/// `Misalignment`) are counted and skipped by the driver and never become a
/// `PipelineError`. Everything here terminates the run after best-effort
/// shard finalization.
#[derive(Debug)]
pub enum PipelineError {
    /// A declared input path (or companion stream) does not exist.
    MissingInput { path: PathBuf },
    /// Fatal decode fault, currently only stream misalignment.
    Decode(DecodeError),
    /// I/O failure on an input stream or an active shard.
    Io(std::io::Error),
    /// External decompression subprocess timed out or exited non-zero.
    Subprocess {
        command: String,
        detail: String,
        stderr: String,
    },
    /// External interruption (SIGINT/SIGTERM) observed mid-run.
    Interrupted,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInput { path } => {
                write!(f, "missing input: {}", path.display())
            }
            Self::Decode(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Subprocess {
                command,
                detail,
                stderr,
            } => {
                if stderr.is_empty() {
                    write!(f, "{command}: {detail}")
                } else {
                    write!(f, "{command}: {detail}\n#### child stderr ####\n{stderr}")
                }
            }
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DecodeError> for PipelineError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}
