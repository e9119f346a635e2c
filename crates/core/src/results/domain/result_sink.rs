use std::path::PathBuf;

use thiserror::Error;

use super::result_record::ResultRecord;

#[derive(Error, Debug)]
#[error("failed to write results to {path}: {source}")]
pub struct SinkWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Persists the accumulated tracking records.
///
/// Every call receives the full sequence so far and replaces whatever was
/// persisted before. A failed call must leave the previous artifact intact.
pub trait ResultSink: Send {
    fn persist(&mut self, records: &[ResultRecord]) -> Result<(), SinkWriteError>;
}
