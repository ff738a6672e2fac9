//! Rolling mean ± kσ envelope around a duration series.

use serde::{Deserialize, Serialize};

use crate::regression::Point;

/// Width of the "clinical range" funnel in standard deviations.
pub const DEFAULT_SIGMA_MULTIPLIER: f64 = 2.0;

/// Upper and lower bands, index-aligned with the input series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeBand {
    pub upper: Vec<Point>,
    pub lower: Vec<Point>,
}

impl EnvelopeBand {
    pub fn len(&self) -> usize {
        self.upper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upper.is_empty()
    }

    /// `upper − lower` at index `i`.
    pub fn width_at(&self, i: usize) -> Option<f64> {
        Some(self.upper.get(i)?.y - self.lower.get(i)?.y)
    }
}

/// Builds centred sliding-window envelopes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeBuilder {
    /// k in μ ± kσ
    pub sigma_multiplier: f64,
    /// Smallest window regardless of series length
    pub min_window: usize,
    /// Window grows as `len / window_divisor`
    pub window_divisor: usize,
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeBuilder {
    pub fn new() -> Self {
        Self {
            sigma_multiplier: DEFAULT_SIGMA_MULTIPLIER,
            min_window: 3,
            window_divisor: 5,
        }
    }

    pub fn with_settings(sigma_multiplier: f64, min_window: usize, window_divisor: usize) -> Self {
        Self {
            sigma_multiplier,
            min_window,
            window_divisor,
        }
    }

    /// The "fine" window for a series of `len` points: `max(3, ⌊len/5⌋)`.
    pub fn window_size(&self, len: usize) -> usize {
        self.min_window.max(len / self.window_divisor.max(1))
    }

    /// Envelope using [`Self::window_size`].
    pub fn build(&self, points: &[Point]) -> EnvelopeBand {
        self.build_with_window(points, self.window_size(points.len()))
    }

    /// Envelope with an explicit window. Each index uses the span
    /// `[i − ⌊w/2⌋, i + ⌊w/2⌋]` clipped to the series. Series shorter than
    /// two points yield empty bands.
    pub fn build_with_window(&self, points: &[Point], window: usize) -> EnvelopeBand {
        if points.len() < 2 {
            return EnvelopeBand::default();
        }

        let half = window / 2;
        let last = points.len() - 1;
        let mut band = EnvelopeBand {
            upper: Vec::with_capacity(points.len()),
            lower: Vec::with_capacity(points.len()),
        };

        for (i, p) in points.iter().enumerate() {
            let start = i.saturating_sub(half);
            let end = (i + half).min(last);
            let (mean, sd) = window_stats(&points[start..=end]);
            let spread = sd * self.sigma_multiplier;

            band.upper.push(Point::new(p.x, mean + spread));
            band.lower.push(Point::new(p.x, (mean - spread).max(0.0)));
        }
        band
    }
}

/// Mean and population standard deviation of the window's y values.
///
/// Variance is `Σy²/n − μ²`, clamped at zero against rounding.
pub fn window_stats(window: &[Point]) -> (f64, f64) {
    if window.is_empty() {
        return (0.0, 0.0);
    }
    let count = window.len() as f64;
    let (sum, sum_sq) = window
        .iter()
        .fold((0.0, 0.0), |(s, sq), p| (s + p.y, sq + p.y * p.y));
    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    (mean, variance.sqrt())
}
