use crate::shared::bbox::{BoxXywh, BoxXyxy};
use crate::shared::frame::Frame;

/// A confirmed track reported by the tracker for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedObject {
    pub bbox: BoxXyxy,
    pub identity: u32,
}

/// Domain interface for multi-object tracking.
///
/// `boxes` and `confidences` are index-aligned. Identities are owned by the
/// tracker and stay stable for as long as it can associate the object.
pub trait ObjectTracker: Send {
    fn update(
        &mut self,
        boxes: &[BoxXywh],
        confidences: &[f64],
        frame: &Frame,
    ) -> Result<Vec<TrackedObject>, Box<dyn std::error::Error>>;
}
