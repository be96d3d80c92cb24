use std::collections::BTreeMap;
use std::time::Instant;

/// Observation seam for the tracking pipeline.
///
/// The use case reports what it is doing here instead of logging directly,
/// so tests can run silently and the CLI can aggregate timings.
pub trait PipelineLogger {
    /// Report frame-level progress. `total` is 0 when the source does not
    /// report a frame count.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-frame metric (e.g. detections, live tracks).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Count, sum and max of one timing or metric series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct RunningStat {
    count: usize,
    sum: f64,
    max: f64,
}

impl RunningStat {
    fn push(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.sum += value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Forwards pipeline events to the `log` facade.
///
/// Progress lines are throttled to one every `throttle_frames` frames.
/// Timings and metrics are folded into running totals and reported once by
/// [`summary`].
///
/// [`summary`]: PipelineLogger::summary
pub struct LogPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, RunningStat>,
    metrics: BTreeMap<String, RunningStat>,
    start_time: Instant,
    frames_seen: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Tracking summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        for (stage, stat) in &self.timings {
            let total_ms = stat.sum;
            let avg_ms = stat.mean();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        for (name, stat) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}  max {:.0}", stat.mean(), stat.max));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    fn should_report(&self, current: usize, total: usize) -> bool {
        current % self.throttle_frames == 0 || (total > 0 && current == total)
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = self.frames_seen.max(current);
        if !self.should_report(current, total) {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Processing: {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("detect", 5.0);
        logger.metric("detections", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_aggregates_per_stage() {
        let mut logger = LogPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("associate", 0.5);

        let detect = logger.timings["detect"];
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.sum, 50.0);
        assert_relative_eq!(detect.max, 30.0);
        assert_eq!(logger.timings["associate"].count, 1);
        assert!(!logger.timings.contains_key("decode"));
    }

    #[test]
    fn test_many_frames_keep_one_entry_per_key() {
        let mut logger = LogPipelineLogger::new(10);
        for i in 0..10_000 {
            logger.metric("live_tracks", (i % 4) as f64);
            logger.timing("detect", 1.0);
        }

        assert_eq!(logger.metrics.len(), 1);
        let stat = logger.metrics["live_tracks"];
        assert_eq!(stat.count, 10_000);
        assert_relative_eq!(stat.mean(), 1.5);
        assert_relative_eq!(stat.max, 3.0);
    }

    #[test]
    fn test_running_stat_max_handles_negative_values() {
        let mut stat = RunningStat::default();
        stat.push(-3.0);
        stat.push(-1.0);
        assert_relative_eq!(stat.max, -1.0);
        assert_relative_eq!(stat.mean(), -2.0);
    }

    #[test]
    fn test_empty_running_stat_mean_is_zero() {
        assert_relative_eq!(RunningStat::default().mean(), 0.0);
    }

    #[test]
    fn test_summary_lists_stages_and_metric_stats() {
        let mut logger = LogPipelineLogger::new(10);
        logger.progress(10, 10);
        logger.timing("detect", 10.0);
        logger.metric("live_tracks", 3.0);
        logger.metric("live_tracks", 4.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Tracking summary (10 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("live_tracks: avg 3.5  max 4"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = LogPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_highest_frame() {
        let mut logger = LogPipelineLogger::new(10);
        for i in 1..=20 {
            logger.progress(i, 0);
        }
        assert_eq!(logger.frames_seen, 20);
    }

    #[rstest]
    #[case(10, 100, true)]
    #[case(11, 100, false)]
    #[case(100, 100, true)]
    #[case(7, 7, true)]
    #[case(7, 0, false)]
    fn test_progress_throttle(#[case] current: usize, #[case] total: usize, #[case] expected: bool) {
        let logger = LogPipelineLogger::new(10);
        assert_eq!(logger.should_report(current, total), expected);
    }

    #[test]
    fn test_zero_throttle_clamps_to_one() {
        let logger = LogPipelineLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
    }
}
