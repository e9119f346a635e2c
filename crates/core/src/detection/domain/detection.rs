use crate::shared::bbox::BoxXywh;

/// One candidate object reported by the detector for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoxXywh,
    pub confidence: f64,
    pub class_id: u32,
}

impl Detection {
    pub fn new(bbox: BoxXywh, confidence: f64, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}
