use std::path::PathBuf;
use std::process;

use clap::Parser;

use vidtrack_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use vidtrack_core::config::app_config::{AppConfig, DetectorConfig};
use vidtrack_core::detection::domain::object_detector::ObjectDetector;
use vidtrack_core::detection::infrastructure::bytetrack_tracker::ByteTracker;
use vidtrack_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use vidtrack_core::pipeline::pipeline_logger::LogPipelineLogger;
use vidtrack_core::pipeline::session_config::SessionConfig;
use vidtrack_core::pipeline::track_video_use_case::TrackVideoUseCase;
use vidtrack_core::results::infrastructure::text_result_sink::{RecordFormat, TextResultSink};
use vidtrack_core::shared::constants::{
    DEFAULT_DILATION, DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH, PERSON_CLASS_ID,
};
use vidtrack_core::shared::model_resolver;
use vidtrack_core::video::domain::frame_source::SourceSpec;
use vidtrack_core::video::infrastructure::ffmpeg_recorder::FfmpegRecorder;
use vidtrack_core::video::infrastructure::ffmpeg_source::FfmpegSource;
use vidtrack_core::video::infrastructure::preview_image_display::PreviewImageDisplay;

/// Detect and track objects in a video file or camera stream.
#[derive(Parser)]
#[command(name = "vidtrack")]
struct Cli {
    /// Input video file.
    #[arg(required_unless_present = "camera", conflicts_with = "camera")]
    input: Option<PathBuf>,

    /// Read from this capture device instead of a file.
    #[arg(long)]
    camera: Option<u32>,

    /// Detector configuration (JSON).
    #[arg(long, default_value = "./configs/detector.json")]
    config_detection: PathBuf,

    /// Tracker configuration (JSON).
    #[arg(long, default_value = "./configs/tracker.json")]
    config_tracker: PathBuf,

    /// Keep a live preview image of the processed stream.
    #[arg(long)]
    display: bool,

    /// Process every Nth frame (1 = every frame).
    #[arg(long, default_value = "1")]
    frame_interval: usize,

    #[arg(long, default_value_t = DEFAULT_DISPLAY_WIDTH)]
    display_width: u32,

    #[arg(long, default_value_t = DEFAULT_DISPLAY_HEIGHT)]
    display_height: u32,

    /// Directory for results.txt and results.avi.
    #[arg(long, default_value = "./output/")]
    save_path: PathBuf,

    /// Run inference on the CPU only.
    #[arg(long)]
    cpu: bool,

    /// Detector class id to track (0 = person on COCO models).
    #[arg(long, default_value_t = PERSON_CLASS_ID)]
    class_id: u32,

    /// Multiplier applied to detection width and height before tracking.
    #[arg(long, default_value_t = DEFAULT_DILATION)]
    dilation: f64,

    /// Record and display frames without boxes.
    #[arg(long)]
    no_annotate: bool,

    /// Result file layout: mot or kitti.
    #[arg(long, default_value = "mot")]
    format: RecordFormat,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = AppConfig::load(&[
        cli.config_detection.as_path(),
        cli.config_tracker.as_path(),
    ])?;
    if cli.cpu {
        log::warn!("Running in CPU mode, inference may be slow");
    }
    let detector = build_detector(&config.detector, !cli.cpu)?;
    let tracker = ByteTracker::new(config.tracker.clone());

    let source = match (cli.camera, &cli.input) {
        (Some(index), _) => SourceSpec::Camera(index),
        (None, Some(path)) => SourceSpec::File(path.clone()),
        (None, None) => return Err("an input file or --camera is required".into()),
    };
    log::info!("Save results to {}", cli.save_path.display());

    let session = SessionConfig {
        class_id: cli.class_id,
        dilation: cli.dilation,
        frame_interval: cli.frame_interval,
        ..SessionConfig::new(source, cli.save_path.clone())
    };

    let mut use_case = TrackVideoUseCase::new(
        Box::new(FfmpegSource::new()),
        detector,
        Box::new(tracker),
        Box::new(TextResultSink::in_dir(&cli.save_path, cli.format)),
        session,
    )
    .with_recorder(Box::new(FfmpegRecorder::new()))
    .with_logger(Box::new(LogPipelineLogger::new()));

    if !cli.no_annotate {
        use_case = use_case.with_annotator(Box::new(BoxAnnotator::new()));
    }
    if cli.display {
        let display = PreviewImageDisplay::new(
            &cli.save_path,
            (cli.display_width, cli.display_height),
        );
        log::info!("Preview image at {}", display.path().display());
        use_case = use_case.with_display(Box::new(display));
    }

    let summary = use_case.execute()?;
    log::info!(
        "Processed {} of {} frames, {} result records in {}",
        summary.cycles,
        summary.frames_pulled,
        summary.records,
        cli.save_path.display()
    );
    Ok(())
}

fn build_detector(
    config: &DetectorConfig,
    accelerated: bool,
) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    let model_path = resolve_model(config)?;
    Ok(Box::new(OnnxYoloDetector::new(&model_path, config, accelerated)?))
}

/// A local `model_path` wins; otherwise `model_url` is fetched into the cache.
fn resolve_model(config: &DetectorConfig) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = config.model_path.as_deref().filter(|p| p.is_file()) {
        return Ok(path.to_path_buf());
    }
    let Some(url) = config.model_url.as_deref() else {
        return Err(match &config.model_path {
            Some(path) => format!("Detector model not found: {}", path.display()).into(),
            None => "No detector model configured: set detector.model_path or detector.model_url"
                .into(),
        });
    };

    log::info!("Resolving model: {url}");
    let model_path = model_resolver::resolve(
        url,
        bundled_models_dir().as_deref(),
        Some(Box::new(download_progress)),
    )?;
    eprintln!();
    Ok(model_path)
}

/// `models/` next to the executable, if present.
fn bundled_models_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?.join("models");
    dir.is_dir().then_some(dir)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.display_width == 0 || cli.display_height == 0 {
        return Err(format!(
            "Display size must be non-zero, got {}x{}",
            cli.display_width, cli.display_height
        )
        .into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detector model... {pct}%");
    } else {
        eprint!("\rDownloading detector model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_left_to_the_session() {
        let cli = Cli::try_parse_from(["vidtrack", "does/not/exist.mp4"]).unwrap();
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_zero_display_size_rejected() {
        let cli =
            Cli::try_parse_from(["vidtrack", "--camera", "0", "--display-width", "0"]).unwrap();
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_input_and_camera_conflict() {
        assert!(Cli::try_parse_from(["vidtrack", "clip.mp4", "--camera", "0"]).is_err());
    }
}
