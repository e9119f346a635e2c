use crate::detection::domain::object_tracker::TrackedObject;
use crate::shared::frame::Frame;

/// Domain interface for rendering tracks onto a frame.
///
/// The input frame is left untouched; implementations return a new frame of
/// the same geometry and pixel order.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &Frame,
        tracks: &[TrackedObject],
    ) -> Result<Frame, Box<dyn std::error::Error>>;
}
