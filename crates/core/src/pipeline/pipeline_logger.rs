use std::time::Instant;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Decouples the use case from specific output mechanisms (stdout, GUI
/// signals, log crate) so each caller can observe job progress without
/// changing the orchestration code. Messages are append-only and safe to
/// publish from the worker thread.
pub trait PipelineLogger: Send {
    /// A new pipeline stage has started.
    fn stage(&mut self, name: &str);

    /// Report progress within the current stage (e.g. poll attempts).
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-job summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events. Used by tests and embedders
/// with their own progress reporting.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn stage(&mut self, _name: &str) {}
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that tracks per-stage timing and provides a summary
/// at job completion.
///
/// Progress output is throttled to every `throttle` updates to keep long
/// poll loops from flooding the log.
pub struct StdoutPipelineLogger {
    throttle: usize,
    timings: Vec<(String, f64)>,
    messages: Vec<String>,
    start_time: Instant,
}

impl StdoutPipelineLogger {
    pub fn new(throttle: usize) -> Self {
        Self {
            throttle: throttle.max(1),
            timings: Vec::new(),
            messages: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!("Job summary ({elapsed_s:.1}s total):")];
        for (stage, duration_ms) in &self.timings {
            lines.push(format!("  {stage:12}: {:.1}s", duration_ms / 1000.0));
        }
        Some(lines.join("\n"))
    }

    /// Returns the recorded timing for a given stage.
    pub fn timing_for(&self, stage: &str) -> Option<f64> {
        self.timings
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, ms)| *ms)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn stage(&mut self, name: &str) {
        log::info!("stage: {name}");
    }

    fn progress(&mut self, current: usize, total: usize) {
        if current % self.throttle == 0 || current == total {
            log::info!("waiting on transcription: poll {current}/{total}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.push((stage.to_string(), duration_ms));
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
