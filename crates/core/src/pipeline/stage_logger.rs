use std::collections::HashMap;
use std::time::Instant;

use crate::shared::constants::SEGMENT_LOG_INTERVAL;

/// Cross-cutting logger for run orchestration events.
///
/// Lets the controller report stage timings and segment throughput without
/// knowing whether anyone is listening.
pub trait StageLogger: Send {
    /// Report that the `count`-th segment (1-based) was consumed.
    fn segment(&mut self, count: usize, end_secs: f64);

    /// Record how long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. media duration, segment length).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by tests and embedders with their own reporting.
pub struct NullStageLogger;

impl StageLogger for NullStageLogger {
    fn segment(&mut self, _count: usize, _end_secs: f64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Forwards to the `log` facade and keeps per-stage timings for a summary.
///
/// Segment progress is logged at debug level every `segment_interval`
/// segments.
pub struct LogStageLogger {
    segment_interval: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    segments: usize,
    audio_secs: f64,
}

impl LogStageLogger {
    pub fn new(segment_interval: usize) -> Self {
        Self {
            segment_interval: segment_interval.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            segments: 0,
            audio_secs: 0.0,
        }
    }

    /// Returns the formatted summary string, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.segments == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Run summary ({} segments, {:.1}s total):",
            self.segments,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let total_ms: f64 = self.timings[stage].iter().sum();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {stage:12}: {total_ms:8.0}ms  ({pct:4.1}%)"));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let avg = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        if self.audio_secs > 0.0 && elapsed_ms > 0.0 {
            let speed = self.audio_secs / (elapsed_ms / 1000.0);
            lines.push(format!("  Speed: {speed:.2}x realtime"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for LogStageLogger {
    fn default() -> Self {
        Self::new(SEGMENT_LOG_INTERVAL)
    }
}

impl StageLogger for LogStageLogger {
    fn segment(&mut self, count: usize, end_secs: f64) {
        self.segments = count;
        self.audio_secs = self.audio_secs.max(end_secs);
        if count % self.segment_interval == 0 {
            log::debug!("Processed segment {count} (up to {end_secs:.1}s)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
