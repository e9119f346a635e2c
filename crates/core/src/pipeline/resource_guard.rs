use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_display::FrameDisplay;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::video_writer::VideoWriter;

/// Owns the frame source for a session and closes it when dropped.
pub struct SourceGuard {
    source: Box<dyn FrameSource>,
}

impl SourceGuard {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self { source }
    }
}

impl Deref for SourceGuard {
    type Target = dyn FrameSource;

    fn deref(&self) -> &Self::Target {
        self.source.as_ref()
    }
}

impl DerefMut for SourceGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.source.as_mut()
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.source.close();
    }
}

/// Optional recorder that finalizes its output when dropped.
///
/// A failed write is logged and the recorder is closed and disabled for the
/// rest of the session.
pub struct RecorderGuard {
    recorder: Option<Box<dyn VideoWriter>>,
}

impl RecorderGuard {
    pub fn disabled() -> Self {
        Self { recorder: None }
    }

    /// Opens `recorder` at `path`. On failure the recorder is closed before
    /// the error is returned.
    pub fn open(
        recorder: Box<dyn VideoWriter>,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut guard = Self {
            recorder: Some(recorder),
        };
        if let Some(recorder) = guard.recorder.as_mut() {
            recorder.open(path, metadata)?;
        }
        Ok(guard)
    }

    pub fn is_active(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn write(&mut self, frame: &Frame) {
        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };
        if let Err(e) = recorder.write(frame) {
            log::warn!("Recording failed, disabling it for this session: {e}");
            self.release();
        }
    }

    /// Finalizes the recording. Further writes are ignored.
    pub fn release(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            if let Err(e) = recorder.close() {
                log::warn!("Failed to finalize recording: {e}");
            }
        }
    }
}

impl Drop for RecorderGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Optional display with the same disable-on-failure behavior as
/// [`RecorderGuard`].
pub struct DisplayGuard {
    display: Option<Box<dyn FrameDisplay>>,
}

impl DisplayGuard {
    pub fn new(display: Option<Box<dyn FrameDisplay>>) -> Self {
        Self { display }
    }

    pub fn is_active(&self) -> bool {
        self.display.is_some()
    }

    pub fn show(&mut self, frame: &Frame) {
        let Some(display) = self.display.as_mut() else {
            return;
        };
        if let Err(e) = display.show(frame) {
            log::warn!("Display failed, disabling it for this session: {e}");
            self.release();
        }
    }

    pub fn release(&mut self) {
        if let Some(mut display) = self.display.take() {
            display.close();
        }
    }
}

impl Drop for DisplayGuard {
    fn drop(&mut self) {
        self.release();
    }
}
