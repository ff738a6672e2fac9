//! Detection of the active phase of labor.
//!
//! Early contractions are irregular and make the envelope look falsely
//! stable. The active phase begins with a sustained run of short gaps; only
//! that suffix of the series is used for fitting.

use chrono::Duration;

/// Scans a chronological series for the onset of sustained short gaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivePhaseDetector {
    /// A gap counts toward the run when strictly shorter than this
    pub gap_threshold: Duration,
    /// Consecutive short gaps required
    pub run_length: usize,
    /// Fraction of the series skipped when no run is found
    pub fallback_fraction: f64,
    /// The fallback never leaves fewer than this many points
    pub min_active_points: usize,
}

impl Default for ActivePhaseDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivePhaseDetector {
    pub fn new() -> Self {
        Self {
            gap_threshold: Duration::minutes(6),
            run_length: 3,
            fallback_fraction: 0.5,
            min_active_points: 3,
        }
    }

    /// Index of the first short gap's starting point in the earliest
    /// qualifying run, or `None` if no run exists.
    ///
    /// `times` are epoch milliseconds in ascending order.
    pub fn find_run_start(&self, times: &[i64]) -> Option<usize> {
        let threshold = self.gap_threshold.num_milliseconds();
        let mut consecutive = 0;
        for i in 1..times.len() {
            if times[i] - times[i - 1] < threshold {
                consecutive += 1;
            } else {
                consecutive = 0;
            }
            if consecutive >= self.run_length.max(1) {
                return Some(i - self.run_length.max(1));
            }
        }
        None
    }

    /// Start index of the active phase.
    ///
    /// Without a qualifying run the later part of the series is used,
    /// starting at `⌊len × fallback_fraction⌋` but never leaving fewer than
    /// `min_active_points` points.
    pub fn detect(&self, times: &[i64]) -> usize {
        if let Some(start) = self.find_run_start(times) {
            return start;
        }
        let len = times.len();
        let fallback = (len as f64 * self.fallback_fraction).floor() as usize;
        fallback.min(len.saturating_sub(self.min_active_points))
    }
}
