use std::borrow::Cow;

use ndarray::ArrayView3;

/// Channel order of a 3-channel frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Bgr,
}

/// A single video frame: contiguous 3-channel bytes in row-major order.
///
/// `index` is the 0-based position of the frame in the source's decode order.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    format: PixelFormat,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        Self::with_format(data, width, height, channels, PixelFormat::Rgb, index)
    }

    pub fn with_format(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        format: PixelFormat,
        index: usize,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            format,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the frame in `format`, borrowing when no conversion is needed.
    ///
    /// RGB and BGR differ only by the order of the first and third channel,
    /// so conversion in either direction is the same swap.
    pub fn converted_to(&self, format: PixelFormat) -> Cow<'_, Frame> {
        if self.format == format || self.channels < 3 {
            return Cow::Borrowed(self);
        }
        let mut data = self.data.clone();
        for pixel in data.chunks_exact_mut(self.channels as usize) {
            pixel.swap(0, 2);
        }
        Cow::Owned(Self {
            data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            format,
            index: self.index,
        })
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
