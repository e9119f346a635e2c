use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::{FrameSource, SourceSpec};

/// Decodes frames from a video file or capture device via ffmpeg-next.
///
/// Each decoded frame is converted to RGB24. Packets are pulled one at a
/// time, so memory stays bounded no matter how long the stream runs.
pub struct FfmpegSource {
    state: Option<DecodeState>,
    /// First frame of a device that only reports its size once streaming.
    pending: Option<Frame>,
}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    live: bool,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegSource {}

impl FfmpegSource {
    pub fn new() -> Self {
        Self {
            state: None,
            pending: None,
        }
    }
}

impl Default for FfmpegSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegSource {
    fn open(&mut self, spec: &SourceSpec) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let (ictx, live) = match spec {
            SourceSpec::File(path) => {
                if !path.is_file() {
                    return Err(format!("no such file: {}", path.display()).into());
                }
                (ffmpeg_next::format::input(path)?, false)
            }
            SourceSpec::Camera(index) => (open_camera(*index)?, true),
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let total_frames = if live { 0 } else { stream.frames().max(0) as usize };
        let codec = decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_default();

        let mut state = DecodeState {
            ictx,
            decoder,
            scaler: None,
            video_stream_index,
            live,
            frame_index: 0,
            flushing: false,
            done: false,
        };

        let (mut width, mut height) = (state.decoder.width(), state.decoder.height());
        if width == 0 || height == 0 {
            let first = state
                .decode_next()?
                .ok_or("Source produced no frames to read its size from")?;
            width = first.width();
            height = first.height();
            self.pending = Some(first);
        }

        self.state = Some(state);

        Ok(VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec,
            source_path: match spec {
                SourceSpec::File(path) => Some(path.clone()),
                SourceSpec::Camera(_) => None,
            },
        })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        match self.state.as_mut() {
            Some(state) => state.decode_next(),
            None => Err("FfmpegSource: not opened".into()),
        }
    }

    fn close(&mut self) {
        self.state = None;
        self.pending = None;
    }
}

impl DecodeState {
    fn decode_next(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }

        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }

        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    if self.live {
                        return Err("capture device stopped delivering frames".into());
                    }
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                    if let Some(frame) = self.try_receive()? {
                        return Ok(Some(frame));
                    }
                    self.done = true;
                    return Ok(None);
                }
                Err(e) => return Err(Box::new(e)),
            }

            if packet.stream() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::warn!("Skipping undecodable packet: {e}");
                continue;
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        match self.decoder.receive_frame(&mut decoded) {
            Ok(()) => {}
            Err(e) if is_drained(&e) => return Ok(None),
            Err(e) => return Err(Box::new(e)),
        }

        let (width, height) = (decoded.width(), decoded.height());
        let scaler = match self.scaler.as_mut() {
            Some(scaler) => scaler,
            None => self.scaler.insert(ffmpeg_next::software::scaling::Context::get(
                decoded.format(),
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?),
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        let frame = Frame::with_format(pixels, width, height, 3, PixelFormat::Rgb, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

/// Opens a capture device through the platform's ffmpeg input device.
fn open_camera(
    index: u32,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    ffmpeg_next::device::register_all();

    let (device_format, url) = camera_url(index);
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == device_format)
        .ok_or_else(|| format!("ffmpeg was built without the {device_format} input device"))?;

    match ffmpeg_next::format::open_with(
        &url,
        &ffmpeg_next::format::Format::Input(format),
        ffmpeg_next::Dictionary::new(),
    )? {
        ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
        ffmpeg_next::format::context::Context::Output(_) => {
            Err(format!("{url} opened as an output device").into())
        }
    }
}

/// Device format name and URL for camera `index` on this platform.
fn camera_url(index: u32) -> (&'static str, String) {
    #[cfg(target_os = "macos")]
    {
        ("avfoundation", format!("{index}"))
    }
    #[cfg(target_os = "windows")]
    {
        ("dshow", format!("video={index}"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        ("v4l2", format!("/dev/video{index}"))
    }
}

/// The decoder needs more input, or has nothing left after a flush.
fn is_drained(e: &ffmpeg_next::Error) -> bool {
    matches!(
        e,
        ffmpeg_next::Error::Eof
            | ffmpeg_next::Error::Other {
                errno: ffmpeg_next::util::error::EAGAIN
            }
    )
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    /// Encodes `num_frames` solid gray MPEG4 frames whose brightness steps
    /// by 40 per frame.
    pub(crate) fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        ffmpeg_next::init().unwrap();
        let fps = 30;

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        let mut drain = |encoder: &mut ffmpeg_next::encoder::Video,
                         octx: &mut ffmpeg_next::format::context::Output| {
            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let stride = rgb_frame.stride(0);
            let value = ((i * 40) % 256) as u8;
            let data = rgb_frame.data_mut(0);
            for row in 0..height as usize {
                data[row * stride..row * stride + width as usize * 3].fill(value);
            }

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));
            encoder.send_frame(&yuv_frame).unwrap();
            drain(&mut encoder, &mut octx);
        }

        encoder.send_eof().unwrap();
        drain(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    fn test_video(dir: &Path, frames: usize) -> PathBuf {
        let path = dir.join("test.mp4");
        create_test_video(&path, frames, 160, 120);
        path
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 5);

        let mut source = FfmpegSource::new();
        let meta = source.open(&SourceSpec::File(path.clone())).unwrap();
        assert_eq!(meta.geometry(), (160, 120));
        assert!(meta.fps > 0.0);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let mut source = FfmpegSource::new();
        let spec = SourceSpec::File(PathBuf::from("/nonexistent/test.mp4"));
        assert!(source.open(&spec).is_err());
    }

    #[test]
    fn test_pulls_every_frame_then_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 5);

        let mut source = FfmpegSource::new();
        source.open(&SourceSpec::File(path)).unwrap();

        let mut indices = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.format(), PixelFormat::Rgb);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
            indices.push(frame.index());
        }
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);

        // Exhaustion is sticky.
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_next_frame_without_open_is_error() {
        let mut source = FfmpegSource::new();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_close_is_idempotent_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 1);

        let mut source = FfmpegSource::new();
        source.open(&SourceSpec::File(path)).unwrap();
        source.close();
        source.close();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_only_eagain_and_eof_mean_no_frame() {
        assert!(is_drained(&ffmpeg_next::Error::Eof));
        assert!(is_drained(&ffmpeg_next::Error::Other {
            errno: ffmpeg_next::util::error::EAGAIN
        }));
        assert!(!is_drained(&ffmpeg_next::Error::InvalidData));
        assert!(!is_drained(&ffmpeg_next::Error::Other {
            errno: ffmpeg_next::util::error::EINVAL
        }));
    }
}
