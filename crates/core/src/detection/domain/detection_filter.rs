use crate::shared::bbox::BoxXywh;

use super::detection::Detection;

/// Index-aligned boxes and confidences ready to hand to the tracker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackerInput {
    pub boxes: Vec<BoxXywh>,
    pub confidences: Vec<f64>,
}

impl TrackerInput {
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Keeps detections of one class and enlarges their boxes.
///
/// Detector boxes tend to be undersized for tracking, so each kept box has
/// its width and height multiplied by `dilation` around an unchanged center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionFilter {
    class_id: u32,
    dilation: f64,
}

impl DetectionFilter {
    pub fn new(class_id: u32, dilation: f64) -> Self {
        Self { class_id, dilation }
    }

    /// Applies the class filter then the dilation, preserving detector order.
    pub fn apply(&self, detections: &[Detection]) -> TrackerInput {
        let (boxes, confidences) = self
            .select_class(detections)
            .map(|d| (d.bbox.dilated(self.dilation), d.confidence))
            .unzip();
        TrackerInput { boxes, confidences }
    }

    fn select_class<'a>(
        &self,
        detections: &'a [Detection],
    ) -> impl Iterator<Item = &'a Detection> + 'a {
        let class_id = self.class_id;
        detections.iter().filter(move |d| d.class_id == class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(cx: f64, confidence: f64, class_id: u32) -> Detection {
        Detection::new(BoxXywh::new(cx, 50.0, 10.0, 20.0), confidence, class_id)
    }

    #[test]
    fn test_keeps_only_selected_class_in_order() {
        let dets = vec![
            det(1.0, 0.9, 0),
            det(2.0, 0.8, 1),
            det(3.0, 0.7, 0),
            det(4.0, 0.6, 2),
        ];
        let input = DetectionFilter::new(0, 1.0).apply(&dets);

        assert_eq!(input.len(), 2);
        assert_eq!(input.confidences, vec![0.9, 0.7]);
        assert_relative_eq!(input.boxes[0].center_x, 1.0);
        assert_relative_eq!(input.boxes[1].center_x, 3.0);
    }

    #[test]
    fn test_dilates_kept_boxes() {
        let dets = vec![Detection::new(
            BoxXywh::new(100.0, 100.0, 20.0, 30.0),
            0.9,
            0,
        )];
        let input = DetectionFilter::new(0, 1.2).apply(&dets);

        let b = input.boxes[0];
        assert_relative_eq!(b.center_x, 100.0);
        assert_relative_eq!(b.center_y, 100.0);
        assert_relative_eq!(b.width, 24.0);
        assert_relative_eq!(b.height, 36.0);
    }

    #[test]
    fn test_no_matching_class_yields_empty_input() {
        let dets = vec![det(1.0, 0.9, 3), det(2.0, 0.8, 4)];
        let input = DetectionFilter::new(0, 1.2).apply(&dets);
        assert!(input.is_empty());
        assert!(input.confidences.is_empty());
    }

    #[test]
    fn test_empty_detections() {
        assert!(DetectionFilter::new(0, 1.2).apply(&[]).is_empty());
    }

    #[test]
    fn test_other_class_can_be_selected() {
        let dets = vec![det(1.0, 0.9, 0), det(2.0, 0.8, 2)];
        let input = DetectionFilter::new(2, 1.0).apply(&dets);
        assert_eq!(input.confidences, vec![0.8]);
    }
}
