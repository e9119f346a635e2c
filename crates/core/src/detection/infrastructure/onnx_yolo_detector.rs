/// Multi-class YOLO object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference and per-class NMS. Expects the
/// YOLOv8 export layout: one row per anchor holding `cx, cy, w, h` followed by
/// one score per class, with no separate objectness column.
use std::path::Path;

use crate::config::app_config::DetectorConfig;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::bbox::BoxXywh;
use crate::shared::frame::{Frame, PixelFormat};

use super::execution_provider::execution_providers;

/// YOLO letterbox padding value (114 gray).
const PAD_VALUE: f32 = 114.0 / 255.0;

/// YOLO object detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    nms_threshold: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting
    /// NCHW). Falls back to `config.input_size` if the shape is dynamic.
    pub fn new(
        model_path: &Path,
        config: &DetectorConfig,
        accelerated: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(execution_providers(accelerated))?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(config.input_size);

        log::info!(
            "Loaded detector {} (input {input_size}x{input_size})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence: config.confidence_threshold,
            nms_threshold: config.nms_threshold,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }

        // [1, features, anchors] is the usual export; [1, anchors, features]
        // shows up after some post-export transposes.
        let transposed = shape[1] < shape[2];
        let (num_anchors, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Err(format!("YOLO output has no class scores: {shape:?}").into());
        }

        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        let feature = |anchor: usize, f: usize| -> f32 {
            if transposed {
                data[f * num_anchors + anchor]
            } else {
                data[anchor * num_feats + f]
            }
        };

        let mut candidates = Vec::new();
        for anchor in 0..num_anchors {
            let (class_id, score) = (4..num_feats)
                .map(|f| (f - 4, feature(anchor, f)))
                .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
            let score = score as f64;
            if score < self.confidence {
                continue;
            }
            let bbox = letterbox.to_frame(BoxXywh::new(
                feature(anchor, 0) as f64,
                feature(anchor, 1) as f64,
                feature(anchor, 2) as f64,
                feature(anchor, 3) as f64,
            ));
            candidates.push(Detection::new(bbox, score, class_id as u32));
        }

        Ok(nms(candidates, self.nms_threshold))
    }

    fn input_format(&self) -> PixelFormat {
        PixelFormat::Rgb
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping between letterboxed model coordinates and frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(&self, b: BoxXywh) -> BoxXywh {
        BoxXywh::new(
            (b.center_x - self.pad_x as f64) / self.scale,
            (b.center_y - self.pad_y as f64) / self.scale,
            b.width / self.scale,
            b.height / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns the NCHW float32 tensor and the mapping back to frame coordinates.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region.
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy per-class NMS: sort by confidence descending, suppress boxes of the
/// same class that overlap a kept box by more than `iou_thresh`.
fn nms(mut dets: Vec<Detection>, iou_thresh: f64) -> Vec<Detection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let corners: Vec<_> = dets.iter().map(|d| d.bbox.to_xyxy()).collect();
    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i]);
        for j in (i + 1)..dets.len() {
            if suppressed[j] || dets[j].class_id != dets[i].class_id {
                continue;
            }
            if corners[i].iou(&corners[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(cx: f64, cy: f64, size: f64, confidence: f64, class_id: u32) -> Detection {
        Detection::new(BoxXywh::new(cx, cy, size, size), confidence, class_id)
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 0.01);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        let y = lb.pad_y as usize + 1;
        let x = lb.pad_x as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, x]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], PAD_VALUE, epsilon = 0.01);
    }

    #[test]
    fn test_letterbox_maps_back_to_frame() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 40,
        };
        let b = lb.to_frame(BoxXywh::new(100.0, 140.0, 20.0, 40.0));
        assert_eq!(b, BoxXywh::new(50.0, 50.0, 10.0, 20.0));
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let kept = nms(
            vec![det(50.0, 50.0, 100.0, 0.8, 0), det(52.0, 52.0, 100.0, 0.9, 0)],
            0.3,
        );
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let kept = nms(
            vec![det(50.0, 50.0, 100.0, 0.9, 0), det(52.0, 52.0, 100.0, 0.8, 2)],
            0.3,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let kept = nms(
            vec![det(25.0, 25.0, 50.0, 0.9, 0), det(225.0, 225.0, 50.0, 0.8, 0)],
            0.3,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_empty_input() {
        assert!(nms(Vec::new(), 0.3).is_empty());
    }
}
