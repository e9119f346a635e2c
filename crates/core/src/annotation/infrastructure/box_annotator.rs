use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::object_tracker::TrackedObject;
use crate::shared::frame::{Frame, PixelFormat};

/// Per-channel multipliers used to spread identities across the color space.
const PALETTE: [u64; 3] = [(1 << 11) - 1, (1 << 15) - 1, (1 << 20) - 1];

const BOX_THICKNESS: u32 = 3;
/// Pixel size of one glyph cell.
const GLYPH_SCALE: u32 = 2;
const LABEL_COLOR: [u8; 3] = [255, 255, 255];

/// 3x5 digit glyphs, one row per byte, most significant of the low 3 bits
/// on the left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Draws a colored rectangle per track with its identity in a filled tab at
/// the top-left corner.
pub struct BoxAnnotator;

impl BoxAnnotator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(
        &self,
        frame: &Frame,
        tracks: &[TrackedObject],
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("cannot annotate {}-channel frame", frame.channels()).into());
        }

        let mut img = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        let in_order = |c: [u8; 3]| match frame.format() {
            PixelFormat::Rgb => Rgb(c),
            PixelFormat::Bgr => Rgb([c[2], c[1], c[0]]),
        };

        for track in tracks {
            let color = in_order(identity_color(track.identity));
            let x = track.bbox.x1 as i32;
            let y = track.bbox.y1 as i32;
            let w = (track.bbox.x2 as i32 - x).max(1) as u32;
            let h = (track.bbox.y2 as i32 - y).max(1) as u32;

            for t in 0..BOX_THICKNESS.min(w.min(h).div_ceil(2)) {
                let inset = t as i32;
                draw_hollow_rect_mut(
                    &mut img,
                    Rect::at(x + inset, y + inset).of_size(w - 2 * t, h - 2 * t),
                    color,
                );
            }

            let label = track.identity.to_string();
            let (tab_w, tab_h) = label_size(&label);
            draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(tab_w, tab_h), color);
            draw_label(&mut img, &label, x + 2, y + 2, in_order(LABEL_COLOR));
        }

        Ok(Frame::with_format(
            img.into_raw(),
            frame.width(),
            frame.height(),
            3,
            frame.format(),
            frame.index(),
        ))
    }
}

/// Deterministic RGB color for an identity.
pub fn identity_color(identity: u32) -> [u8; 3] {
    let i = identity as u64 % 255;
    let k = (i * i - i + 1) % 255;
    PALETTE.map(|p| ((p % 255) * k % 255) as u8)
}

fn label_size(label: &str) -> (u32, u32) {
    let glyph_w = 4 * GLYPH_SCALE;
    (label.len() as u32 * glyph_w + 3, 5 * GLYPH_SCALE + 4)
}

fn draw_label(img: &mut RgbImage, label: &str, x: i32, y: i32, color: Rgb<u8>) {
    let cell = GLYPH_SCALE as i32;
    for (n, digit) in label.bytes().filter(u8::is_ascii_digit).enumerate() {
        let glyph = &DIGITS[(digit - b'0') as usize];
        let gx = x + n as i32 * 4 * cell;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                draw_filled_rect_mut(
                    img,
                    Rect::at(gx + col * cell, y + row as i32 * cell)
                        .of_size(GLYPH_SCALE, GLYPH_SCALE),
                    color,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bbox::BoxXyxy;

    fn gray_frame(w: u32, h: u32, format: PixelFormat) -> Frame {
        Frame::with_format(vec![0u8; (w * h * 3) as usize], w, h, 3, format, 4)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    fn track(x1: f64, y1: f64, x2: f64, y2: f64, identity: u32) -> TrackedObject {
        TrackedObject {
            bbox: BoxXyxy::new(x1, y1, x2, y2),
            identity,
        }
    }

    #[test]
    fn test_identity_color_is_stable_and_distinct() {
        assert_eq!(identity_color(7), identity_color(7));
        assert_ne!(identity_color(1), identity_color(2));
        // id 1: k = 1, so each channel is the multiplier mod 255.
        assert_eq!(identity_color(1), [7, 127, 15]);
    }

    #[test]
    fn test_identity_color_handles_large_ids() {
        let _ = identity_color(u32::MAX);
    }

    #[test]
    fn test_annotate_leaves_input_untouched() {
        let frame = gray_frame(64, 64, PixelFormat::Rgb);
        let out = BoxAnnotator::new()
            .annotate(&frame, &[track(10.0, 10.0, 50.0, 50.0, 3)])
            .unwrap();

        assert!(frame.data().iter().all(|&v| v == 0));
        assert_eq!((out.width(), out.height(), out.index()), (64, 64, 4));
        assert_eq!(out.format(), PixelFormat::Rgb);
    }

    #[test]
    fn test_box_outline_uses_identity_color() {
        let frame = gray_frame(64, 64, PixelFormat::Rgb);
        let out = BoxAnnotator::new()
            .annotate(&frame, &[track(10.0, 10.0, 50.0, 50.0, 3)])
            .unwrap();

        // Bottom-right corner is away from the label tab.
        assert_eq!(pixel(&out, 49, 49), identity_color(3));
        // Box interior is untouched.
        assert_eq!(pixel(&out, 30, 40), [0, 0, 0]);
    }

    #[test]
    fn test_bgr_frames_get_swapped_colors() {
        let frame = gray_frame(64, 64, PixelFormat::Bgr);
        let out = BoxAnnotator::new()
            .annotate(&frame, &[track(10.0, 10.0, 50.0, 50.0, 3)])
            .unwrap();

        let [r, g, b] = identity_color(3);
        assert_eq!(pixel(&out, 49, 49), [b, g, r]);
    }

    #[test]
    fn test_label_is_drawn_inside_tab() {
        let frame = gray_frame(64, 64, PixelFormat::Rgb);
        let out = BoxAnnotator::new()
            .annotate(&frame, &[track(10.0, 10.0, 50.0, 50.0, 1)])
            .unwrap();

        // Top-left cell of the "1" glyph is empty, the center column is set.
        assert_eq!(pixel(&out, 12, 12), identity_color(1));
        assert_eq!(pixel(&out, 14, 12), LABEL_COLOR);
    }

    #[test]
    fn test_boxes_past_the_edge_are_clipped() {
        let frame = gray_frame(32, 32, PixelFormat::Rgb);
        let out = BoxAnnotator::new()
            .annotate(&frame, &[track(-10.0, -10.0, 100.0, 100.0, 9)])
            .unwrap();
        assert_eq!(out.data().len(), 32 * 32 * 3);
    }

    #[test]
    fn test_no_tracks_returns_copy() {
        let frame = gray_frame(8, 8, PixelFormat::Rgb);
        let out = BoxAnnotator::new().annotate(&frame, &[]).unwrap();
        assert_eq!(out.data(), frame.data());
    }

    #[test]
    fn test_single_channel_frame_rejected() {
        let frame = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        assert!(BoxAnnotator::new().annotate(&frame, &[]).is_err());
    }
}
