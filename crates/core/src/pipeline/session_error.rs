use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::results::domain::result_sink::SinkWriteError;

/// Pipeline stage that failed during a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Detection,
    Tracking,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Detection => write!(f, "detection"),
            Stage::Tracking => write!(f, "tracking"),
        }
    }
}

/// Fatal errors that end a tracking session.
///
/// `cycle` is the 1-based ordinal of the pulled frame being handled when the
/// error occurred.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot open {source_desc}: {reason}")]
    SourceUnavailable { source_desc: String, reason: String },
    #[error("failed to read frame {cycle}: {reason}")]
    SourceRead { cycle: usize, reason: String },
    #[error("{stage} failed on frame {cycle}: {reason}")]
    StageFailure {
        cycle: usize,
        stage: Stage,
        reason: String,
    },
    #[error(transparent)]
    SinkWrite(#[from] SinkWriteError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot set up output {path}: {reason}")]
    OutputSetup { path: PathBuf, reason: String },
}
