use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection_filter::DetectionFilter;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::object_tracker::ObjectTracker;
use crate::results::domain::result_record::ResultRecord;
use crate::results::domain::result_sink::ResultSink;
use crate::shared::constants::RECORDING_FILE_NAME;
use crate::shared::frame::Frame;
use crate::video::domain::frame_display::FrameDisplay;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_logger::{CycleReport, NullPipelineLogger, PipelineLogger};
use super::resource_guard::{DisplayGuard, RecorderGuard, SourceGuard};
use super::session_config::SessionConfig;
use super::session_error::{SessionError, Stage};

/// Counts reported when a session ends without a fatal error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames pulled from the source, sampled or not.
    pub frames_pulled: usize,
    /// Frames that went through detection and tracking.
    pub cycles: usize,
    /// Result records persisted.
    pub records: usize,
    pub cancelled: bool,
}

/// Runs detection and tracking over one source from start to exhaustion.
///
/// Results are rewritten in full after every processed frame, so whatever
/// was persisted before a fatal error stays valid. The source, recorder and
/// display are released on every exit path. `execute` consumes the use case.
pub struct TrackVideoUseCase {
    source: Box<dyn FrameSource>,
    detector: Box<dyn ObjectDetector>,
    tracker: Box<dyn ObjectTracker>,
    sink: Box<dyn ResultSink>,
    annotator: Option<Box<dyn FrameAnnotator>>,
    recorder: Option<Box<dyn VideoWriter>>,
    display: Option<Box<dyn FrameDisplay>>,
    logger: Box<dyn PipelineLogger>,
    config: SessionConfig,
    cancelled: Arc<AtomicBool>,
}

impl TrackVideoUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn ObjectDetector>,
        tracker: Box<dyn ObjectTracker>,
        sink: Box<dyn ResultSink>,
        config: SessionConfig,
    ) -> Self {
        Self {
            source,
            detector,
            tracker,
            sink,
            annotator: None,
            recorder: None,
            display: None,
            logger: Box::new(NullPipelineLogger),
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Draw tracks onto frames that are displayed or recorded.
    pub fn with_annotator(mut self, annotator: Box<dyn FrameAnnotator>) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Record processed frames to `results.avi` in the output directory.
    pub fn with_recorder(mut self, recorder: Box<dyn VideoWriter>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_display(mut self, display: Box<dyn FrameDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Flag checked between cycles; setting it ends the session cleanly.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn execute(self) -> Result<SessionSummary, SessionError> {
        self.config.validate()?;

        let Self {
            source,
            detector,
            tracker,
            sink,
            annotator,
            recorder,
            display,
            logger,
            config,
            cancelled,
        } = self;

        let mut source = SourceGuard::new(source);
        let metadata = source
            .open(&config.source)
            .map_err(|e| SessionError::SourceUnavailable {
                source_desc: config.source.to_string(),
                reason: e.to_string(),
            })?;

        fs::create_dir_all(&config.output_dir).map_err(|e| SessionError::OutputSetup {
            path: config.output_dir.clone(),
            reason: e.to_string(),
        })?;

        let recorder = match recorder {
            Some(recorder) => {
                let path = config.output_dir.join(RECORDING_FILE_NAME);
                RecorderGuard::open(recorder, &path, &metadata).map_err(|e| {
                    SessionError::OutputSetup {
                        path: path.clone(),
                        reason: e.to_string(),
                    }
                })?
            }
            None => RecorderGuard::disabled(),
        };

        let (width, height) = metadata.geometry();
        let mut session = RunningSession {
            detector,
            tracker,
            sink,
            annotator,
            logger,
            filter: DetectionFilter::new(config.class_id, config.dilation),
            recorder,
            display: DisplayGuard::new(display),
            records: Vec::new(),
        };
        session.logger.info(&format!(
            "Tracking {} ({width}x{height}), saving results to {}",
            config.source,
            config.output_dir.display()
        ));

        let result = session.run(&mut source, config.frame_interval, &cancelled);
        session.logger.summary();
        result
    }
}

/// Collaborators and accumulated records once the session is initialized.
struct RunningSession {
    detector: Box<dyn ObjectDetector>,
    tracker: Box<dyn ObjectTracker>,
    sink: Box<dyn ResultSink>,
    annotator: Option<Box<dyn FrameAnnotator>>,
    logger: Box<dyn PipelineLogger>,
    filter: DetectionFilter,
    recorder: RecorderGuard,
    display: DisplayGuard,
    records: Vec<ResultRecord>,
}

impl RunningSession {
    fn run(
        &mut self,
        source: &mut SourceGuard,
        frame_interval: usize,
        cancelled: &AtomicBool,
    ) -> Result<SessionSummary, SessionError> {
        let mut summary = SessionSummary::default();

        loop {
            if cancelled.load(Ordering::Relaxed) {
                self.logger.info("Cancelled");
                summary.cancelled = true;
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    return Err(SessionError::SourceRead {
                        cycle: summary.frames_pulled + 1,
                        reason: e.to_string(),
                    })
                }
            };
            summary.frames_pulled += 1;

            let ordinal = summary.frames_pulled;
            if ordinal % frame_interval != 0 {
                continue;
            }

            summary.cycles += 1;
            self.process(&frame, ordinal)?;
        }

        summary.records = self.records.len();
        Ok(summary)
    }

    fn process(&mut self, frame: &Frame, ordinal: usize) -> Result<(), SessionError> {
        let start = Instant::now();
        let stage_input = frame.converted_to(self.detector.input_format());

        let t = Instant::now();
        let detections = self
            .detector
            .detect(&stage_input)
            .map_err(|e| stage_failure(ordinal, Stage::Detection, e))?;
        self.logger.timing("detect", elapsed_ms(t));

        let input = self.filter.apply(&detections);
        let t = Instant::now();
        let tracks = self
            .tracker
            .update(&input.boxes, &input.confidences, &stage_input)
            .map_err(|e| stage_failure(ordinal, Stage::Tracking, e))?;
        self.logger.timing("track", elapsed_ms(t));

        let mut annotated = None;
        if !tracks.is_empty() {
            self.records.push(ResultRecord::from_tracks(ordinal, &tracks));
            if let Some(annotator) = &self.annotator {
                match annotator.annotate(frame, &tracks) {
                    Ok(out) => annotated = Some(out),
                    Err(e) => log::warn!("Annotation failed on frame {ordinal}: {e}"),
                }
            }
        }

        let output = annotated.as_ref().unwrap_or(frame);
        self.display.show(output);
        self.recorder.write(output);

        let t = Instant::now();
        self.sink.persist(&self.records)?;
        self.logger.timing("persist", elapsed_ms(t));

        self.logger.cycle(&CycleReport {
            frame_ordinal: ordinal,
            elapsed: start.elapsed(),
            detections: detections.len(),
            tracks: tracks.len(),
        });
        Ok(())
    }
}

fn stage_failure(cycle: usize, stage: Stage, e: Box<dyn std::error::Error>) -> SessionError {
    SessionError::StageFailure {
        cycle,
        stage,
        reason: e.to_string(),
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
