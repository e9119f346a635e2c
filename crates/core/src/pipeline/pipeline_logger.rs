use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What one processed cycle produced, reported after its results are persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleReport {
    /// 1-based ordinal of the frame among all frames pulled from the source.
    pub frame_ordinal: usize,
    /// Wall time of the whole cycle, side effects and persistence included.
    pub elapsed: Duration,
    /// Raw detector output count, before class filtering.
    pub detections: usize,
    pub tracks: usize,
}

impl CycleReport {
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }
}

/// Accumulated wall time for one named stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTiming {
    pub total_ms: f64,
    pub count: usize,
}

impl StageTiming {
    pub fn average_ms(&self) -> f64 {
        self.total_ms / self.count.max(1) as f64
    }
}

/// Cross-cutting logger for tracking-session events.
///
/// Keeps the orchestration code independent of where its progress output
/// ends up.
pub trait PipelineLogger: Send {
    /// Report one processed cycle.
    fn cycle(&mut self, report: &CycleReport);

    /// Record how long a named stage took for one cycle.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn cycle(&mut self, _report: &CycleReport) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger for the CLI: one `log::info!` line per cycle plus a per-stage
/// timing summary at the end of the session.
pub struct LogPipelineLogger {
    timings: HashMap<String, StageTiming>,
    start_time: Instant,
    cycles: usize,
    messages: Vec<String>,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            start_time: Instant::now(),
            cycles: 0,
            messages: Vec::new(),
        }
    }

    /// The per-cycle line.
    pub fn format_cycle(report: &CycleReport) -> String {
        format!(
            "time: {:.3}s, fps: {:.3}, detection numbers: {}, tracking numbers: {}",
            report.elapsed.as_secs_f64(),
            report.fps(),
            report.detections,
            report.tracks
        )
    }

    /// Returns the formatted summary string, or `None` if nothing was processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.cycles == 0 && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let cycles = self.cycles;
        let mut lines = vec![format!(
            "Session summary ({cycles} cycles, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let timing = self.timings[stage];
            let total_ms = timing.total_ms;
            let avg_ms = timing.average_ms();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        if cycles > 0 && elapsed_ms > 0.0 {
            let fps = cycles as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timing_for(&self, stage: &str) -> Option<StageTiming> {
        self.timings.get(stage).copied()
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn cycle(&mut self, report: &CycleReport) {
        self.cycles += 1;
        log::info!("{}", Self::format_cycle(report));
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        let timing = self.timings.entry(stage.to_string()).or_default();
        timing.total_ms += duration_ms;
        timing.count += 1;
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
