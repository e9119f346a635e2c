use std::path::PathBuf;

use crate::shared::constants::{DEFAULT_DILATION, PERSON_CLASS_ID};
use crate::video::domain::frame_source::SourceSpec;

use super::session_error::SessionError;

/// Resolved settings for one tracking session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub source: SourceSpec,
    /// Directory receiving the result file and the recording.
    pub output_dir: PathBuf,
    /// Only detections of this class are tracked.
    pub class_id: u32,
    /// Width/height multiplier applied to detections before tracking.
    pub dilation: f64,
    /// Process every Nth pulled frame.
    pub frame_interval: usize,
}

impl SessionConfig {
    pub fn new(source: SourceSpec, output_dir: PathBuf) -> Self {
        Self {
            source,
            output_dir,
            class_id: PERSON_CLASS_ID,
            dilation: DEFAULT_DILATION,
            frame_interval: 1,
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.frame_interval == 0 {
            return Err(SessionError::InvalidConfig(
                "frame interval must be at least 1".into(),
            ));
        }
        if !(self.dilation.is_finite() && self.dilation > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "dilation must be a positive number, got {}",
                self.dilation
            )));
        }
        Ok(())
    }
}
