pub mod ffmpeg_recorder;
pub mod ffmpeg_source;
pub mod preview_image_display;
