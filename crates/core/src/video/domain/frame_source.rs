use std::fmt;
use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Where frames come from: a video file or a live capture device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    File(PathBuf),
    Camera(u32),
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::File(path) => write!(f, "{}", path.display()),
            SourceSpec::Camera(index) => write!(f, "camera {index}"),
        }
    }
}

/// Pull-based frame producer.
///
/// Frames are returned in strict capture order. `Ok(None)` marks the end of a
/// file source; a live source that can no longer be read returns an error
/// rather than ending quietly.
pub trait FrameSource: Send {
    /// Opens the source and returns its geometry and timing.
    fn open(&mut self, spec: &SourceSpec) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Blocks until the next frame is available.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the underlying device or file. Safe to call more than once.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_file_spec() {
        let spec = SourceSpec::File(PathBuf::from("/videos/walk.mp4"));
        assert_eq!(spec.to_string(), "/videos/walk.mp4");
    }

    #[test]
    fn test_display_camera_spec() {
        assert_eq!(SourceSpec::Camera(2).to_string(), "camera 2");
    }
}
