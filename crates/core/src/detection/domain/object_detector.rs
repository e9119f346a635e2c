use crate::shared::frame::{Frame, PixelFormat};

use super::detection::Detection;

/// Domain interface for object detection.
///
/// Implementations may keep inference state between calls, hence `&mut self`.
/// Returned detections are in frame pixel coordinates.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;

    /// Channel order the detector expects its input frames in.
    fn input_format(&self) -> PixelFormat {
        PixelFormat::Rgb
    }
}
