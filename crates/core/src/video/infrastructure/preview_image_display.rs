use std::path::{Path, PathBuf};

use crate::shared::constants::PREVIEW_FILE_NAME;
use crate::shared::frame::{Frame, PixelFormat};
use crate::video::domain::frame_display::FrameDisplay;

/// Shows the latest processed frame by overwriting a PNG on disk.
///
/// Every frame is resized to the configured display size and written to a
/// sibling temp file first, so a viewer polling the preview never sees a
/// half-written image.
pub struct PreviewImageDisplay {
    path: PathBuf,
    size: (u32, u32),
}

impl PreviewImageDisplay {
    pub fn new(dir: &Path, size: (u32, u32)) -> Self {
        Self {
            path: dir.join(PREVIEW_FILE_NAME),
            size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameDisplay for PreviewImageDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let rgb = frame.converted_to(PixelFormat::Rgb);
        let img = image::RgbImage::from_raw(rgb.width(), rgb.height(), rgb.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        let (w, h) = self.size;
        let img = if (w, h) == (img.width(), img.height()) {
            img
        } else {
            image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
        };

        let tmp = self.path.with_extension("png.tmp");
        img.save_with_format(&tmp, image::ImageFormat::Png)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
