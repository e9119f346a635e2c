/// Axis-aligned box in center form, as produced by the detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxXywh {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxXywh {
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Scales width and height by `factor`, keeping the center fixed.
    pub fn dilated(&self, factor: f64) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
            ..*self
        }
    }

    pub fn to_xyxy(&self) -> BoxXyxy {
        BoxXyxy {
            x1: self.center_x - self.width / 2.0,
            y1: self.center_y - self.height / 2.0,
            x2: self.center_x + self.width / 2.0,
            y2: self.center_y + self.height / 2.0,
        }
    }
}

/// Axis-aligned box given by its top-left and bottom-right corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxXyxy {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoxXyxy {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Integer top-left/size form used by the result records.
    ///
    /// Coordinates truncate toward zero, matching the integer pixel grid the
    /// tracker reports on.
    pub fn to_tlwh(&self) -> BoxTlwh {
        let x = self.x1 as i32;
        let y = self.y1 as i32;
        BoxTlwh {
            x,
            y,
            width: self.x2 as i32 - x,
            height: self.y2 as i32 - y,
        }
    }

    /// Clamps the box into `[0, width - 1] x [0, height - 1]`.
    pub fn clipped(&self, width: u32, height: u32) -> Self {
        let max_x = (width.max(1) - 1) as f64;
        let max_y = (height.max(1) - 1) as f64;
        Self {
            x1: self.x1.clamp(0.0, max_x),
            y1: self.y1.clamp(0.0, max_y),
            x2: self.x2.clamp(0.0, max_x),
            y2: self.y2.clamp(0.0, max_y),
        }
    }

    pub fn iou(&self, other: &BoxXyxy) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// Integer box in top-left/size form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxTlwh {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoxTlwh {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── Dilation ─────────────────────────────────────────────────────

    #[test]
    fn test_dilation_scales_size_and_keeps_center() {
        let b = BoxXywh::new(100.0, 100.0, 20.0, 30.0).dilated(1.2);
        assert_relative_eq!(b.center_x, 100.0);
        assert_relative_eq!(b.center_y, 100.0);
        assert_relative_eq!(b.width, 24.0);
        assert_relative_eq!(b.height, 36.0);
    }

    #[test]
    fn test_dilation_by_one_is_identity() {
        let b = BoxXywh::new(5.0, 6.0, 7.0, 8.0);
        assert_eq!(b.dilated(1.0), b);
    }

    // ── Conversions ──────────────────────────────────────────────────

    #[test]
    fn test_xywh_to_xyxy() {
        let b = BoxXywh::new(50.0, 40.0, 20.0, 10.0).to_xyxy();
        assert_eq!(b, BoxXyxy::new(40.0, 35.0, 60.0, 45.0));
    }

    #[rstest]
    #[case::integral(BoxXyxy::new(10.0, 20.0, 40.0, 80.0), BoxTlwh::new(10, 20, 30, 60))]
    #[case::fractional(BoxXyxy::new(10.7, 20.2, 40.9, 80.5), BoxTlwh::new(10, 20, 30, 60))]
    #[case::origin(BoxXyxy::new(0.0, 0.0, 1.0, 1.0), BoxTlwh::new(0, 0, 1, 1))]
    fn test_xyxy_to_tlwh(#[case] input: BoxXyxy, #[case] expected: BoxTlwh) {
        assert_eq!(input.to_tlwh(), expected);
    }

    #[test]
    fn test_clipped_clamps_to_frame() {
        let b = BoxXyxy::new(-5.0, -3.0, 120.0, 90.0).clipped(100, 80);
        assert_eq!(b, BoxXyxy::new(0.0, 0.0, 99.0, 79.0));
    }

    #[test]
    fn test_tlwh_edges() {
        let b = BoxTlwh::new(10, 20, 30, 40);
        assert_eq!(b.right(), 40);
        assert_eq!(b.bottom(), 60);
    }

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical() {
        let a = BoxXyxy::new(0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = BoxXyxy::new(0.0, 0.0, 10.0, 10.0);
        let b = BoxXyxy::new(20.0, 20.0, 30.0, 30.0);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = BoxXyxy::new(0.0, 0.0, 10.0, 10.0);
        let b = BoxXyxy::new(5.0, 5.0, 15.0, 15.0);
        assert_relative_eq!(a.iou(&b), 25.0 / 175.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = BoxXyxy::new(0.0, 0.0, 50.0, 50.0);
        let b = BoxXyxy::new(50.0, 0.0, 100.0, 50.0);
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
