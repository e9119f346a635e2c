/// COCO class id of "person", the class tracked by default.
pub const PERSON_CLASS_ID: u32 = 0;

/// Width/height multiplier applied to detector boxes before tracking.
pub const DEFAULT_DILATION: f64 = 1.2;

pub const RESULTS_FILE_NAME: &str = "results.txt";
pub const RECORDING_FILE_NAME: &str = "results.avi";
pub const PREVIEW_FILE_NAME: &str = "preview.png";

/// Frame rate of the annotated recording, independent of the source rate.
pub const RECORDING_FPS: i32 = 20;

pub const DEFAULT_DISPLAY_WIDTH: u32 = 800;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 600;
