use crate::shared::frame::Frame;

/// Presents processed frames to the operator.
///
/// Display is a side effect of the pipeline: failures are reported but never
/// stop tracking.
pub trait FrameDisplay: Send {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    fn close(&mut self) {}
}
