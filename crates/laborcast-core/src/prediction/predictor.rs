//! Delivery prediction from the convergence of the contraction envelope.
//!
//! The pipeline: keep completed observations, sort them, cut to the active
//! phase, build the rolling envelope, fit its upper and lower edges, then
//! walk the fits forward in fixed steps until the upper edge drops to the
//! lower one. "No prediction" is an ordinary answer, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::funnel::FunnelAnalysis;
use crate::config::Config;
use crate::error::ValidationError;
use crate::observation::{completed_observations, validate_all, ContractionRecord, Observation};
use crate::regression::{fit_linear, FittedCurve, Point};

/// How characteristic of late-stage labor the active phase looks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceGrade {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfidenceGrade::Low => "low",
            ConfidenceGrade::Medium => "medium",
            ConfidenceGrade::High => "high",
        };
        f.write_str(s)
    }
}

/// Predicted delivery time. `time` is `None` when the bands did not
/// converge within the horizon or there was not enough data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub time: Option<DateTime<Utc>>,
    pub confidence: ConfidenceGrade,
}

impl Prediction {
    /// The "keep monitoring" answer.
    pub fn absent() -> Self {
        Self {
            time: None,
            confidence: ConfidenceGrade::Low,
        }
    }

    pub fn is_present(&self) -> bool {
        self.time.is_some()
    }
}

/// Forward walk of the fitted band edges.
#[derive(Debug, Clone, Default, PartialEq)]
struct Projection {
    upper: Vec<Point>,
    lower: Vec<Point>,
    intersection: Option<Point>,
}

/// Single-shot predictor; holds configuration only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryPredictor {
    config: Config,
}

impl DeliveryPredictor {
    /// Predictor with default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Predict the delivery time.
    ///
    /// Observations may be in any order. Non-finite or negative durations
    /// are a caller bug: debug builds panic, release builds drop them with
    /// a warning.
    pub fn predict(&self, observations: &[Observation]) -> Prediction {
        let observations = sanitize(observations);
        self.predict_valid(&observations)
    }

    /// Like [`Self::predict`], but reports invalid observations as an error.
    pub fn try_predict(&self, observations: &[Observation]) -> Result<Prediction, ValidationError> {
        validate_all(observations)?;
        Ok(self.predict_valid(observations))
    }

    /// Predict from timer records, using only completed contractions.
    pub fn predict_records(&self, records: &[ContractionRecord]) -> Prediction {
        self.predict(&completed_observations(records))
    }

    /// Run the pipeline and keep every intermediate result for charting.
    ///
    /// Returns `None` when there is not enough data to fit the envelope.
    pub fn analyze(&self, observations: &[Observation]) -> Option<FunnelAnalysis> {
        let observations = sanitize(observations);
        self.run(&observations)
    }

    fn predict_valid(&self, observations: &[Observation]) -> Prediction {
        let Some(analysis) = self.run(observations) else {
            return Prediction::absent();
        };
        match analysis.intersection_time() {
            Some(time) => Prediction {
                time: Some(time),
                confidence: self.grade(analysis.active_points()),
            },
            None => Prediction::absent(),
        }
    }

    fn run(&self, observations: &[Observation]) -> Option<FunnelAnalysis> {
        let min_points = self.config.min_points;

        let mut completed: Vec<Observation> = observations
            .iter()
            .filter(|o| o.has_duration())
            .copied()
            .collect();
        if completed.len() < min_points {
            debug!(completed = completed.len(), min_points, "not enough completed contractions");
            return None;
        }
        completed.sort_by_key(|o| o.time);

        let times: Vec<i64> = completed.iter().map(|o| o.time.timestamp_millis()).collect();
        let points: Vec<Point> = completed.iter().map(Observation::to_point).collect();

        let active_start = self.config.active_phase_detector().detect(&times);
        let active = &points[active_start..];
        debug!(
            total_points = points.len(),
            active_start,
            active_points = active.len(),
            "active phase detected"
        );
        if active.len() < min_points {
            return None;
        }

        let envelope = self.config.envelope_builder().build(active);
        let fitter = self.config.curve_fitter();

        let trend_fit = fitter.fit_best(active).ok();
        let upper_fit = match fitter.fit_best(&envelope.upper) {
            Ok(fit) => fit,
            Err(e) => {
                debug!("upper band fit unavailable: {e}");
                return None;
            }
        };
        let lower_fit = match fitter.fit_best(&envelope.lower) {
            Ok(fit) => fit,
            Err(e) => {
                debug!("lower band fit unavailable: {e}");
                return None;
            }
        };
        debug!(
            trend = ?trend_fit.as_ref().map(|f| f.kind),
            upper = ?upper_fit.kind,
            lower = ?lower_fit.kind,
            "model selection"
        );

        let cap = self.config.display.upper_cap_secs;
        let trend_line = trend_fit
            .as_ref()
            .map(|fit| active.iter().map(|p| Point::new(p.x, fit.predict(p.x))).collect())
            .unwrap_or_default();
        let upper_band = active
            .iter()
            .map(|p| Point::new(p.x, upper_fit.predict(p.x).min(cap)))
            .collect();
        let lower_band = active
            .iter()
            .map(|p| Point::new(p.x, lower_fit.predict(p.x).max(0.0)))
            .collect();

        let width: Vec<Point> = (0..envelope.len())
            .filter_map(|i| Some(Point::new(envelope.upper[i].x, envelope.width_at(i)?)))
            .collect();
        let width_trend = fit_linear(&width).ok();

        let last_x = points[points.len() - 1].x;
        let projection = self.project(&upper_fit, &lower_fit, last_x);

        Some(FunnelAnalysis {
            points,
            active_start,
            envelope,
            trend_fit,
            upper_fit,
            lower_fit,
            trend_line,
            upper_band,
            lower_band,
            projected_upper: projection.upper,
            projected_lower: projection.lower,
            intersection: projection.intersection,
            width_trend,
        })
    }

    /// Step from `start_x` (epoch ms) through the horizon until
    /// `upper ≤ max(0, lower)`. Step 0 is the last observation itself.
    fn project(
        &self,
        upper_fit: &FittedCurve,
        lower_fit: &FittedCurve,
        start_x: f64,
    ) -> Projection {
        let settings = &self.config.projection;
        let Some(step_ms) = settings
            .step_secs
            .checked_mul(1000)
            .filter(|&ms| ms > 0)
        else {
            warn!(step_secs = settings.step_secs, "unusable projection step");
            return Projection::default();
        };
        let step_ms = step_ms as f64;
        let steps = settings.horizon_secs / settings.step_secs;
        let edges = |x: f64| (upper_fit.predict(x), lower_fit.predict(x).max(0.0));

        let mut projection = Projection::default();
        let mut previous: Option<(f64, f64)> = None;

        for k in 0..=steps {
            let x = start_x + k as f64 * step_ms;
            let (u, l) = edges(x);

            if u <= l {
                let crossing_x = match previous {
                    Some((prev_x, prev_gap)) if settings.interpolate_crossing => {
                        let gap = u - l;
                        prev_x + (x - prev_x) * prev_gap / (prev_gap - gap)
                    }
                    _ => x,
                };
                let (cu, cl) = edges(crossing_x);
                let crossing = Point::new(crossing_x, (cu + cl) / 2.0);
                projection.upper.push(crossing);
                projection.lower.push(crossing);
                projection.intersection = Some(crossing);
                debug!(step = k, "bands converged");
                return projection;
            }

            projection.upper.push(Point::new(x, u));
            projection.lower.push(Point::new(x, l));
            previous = Some((x, u - l));
        }

        debug!(steps, "no convergence within horizon");
        projection
    }

    /// Grade the active phase by average start-to-start gap and duration.
    pub fn grade(&self, active: &[Point]) -> ConfidenceGrade {
        let thresholds = &self.config.confidence;
        if active.is_empty() {
            return ConfidenceGrade::Low;
        }

        let avg_gap_secs = if active.len() > 1 {
            (active[active.len() - 1].x - active[0].x) / (active.len() - 1) as f64 / 1000.0
        } else {
            0.0
        };
        let avg_duration = active.iter().map(|p| p.y).sum::<f64>() / active.len() as f64;
        let strong = avg_duration >= thresholds.min_strong_duration_secs;

        if avg_gap_secs < thresholds.high_max_gap_secs && strong {
            ConfidenceGrade::High
        } else if (avg_gap_secs < thresholds.medium_max_gap_secs && strong)
            || active.len() >= thresholds.medium_min_points
        {
            ConfidenceGrade::Medium
        } else {
            ConfidenceGrade::Low
        }
    }
}

/// Drop observations that violate the duration precondition.
fn sanitize(observations: &[Observation]) -> Vec<Observation> {
    observations
        .iter()
        .enumerate()
        .filter_map(|(i, o)| match o.validate(i) {
            Ok(()) => Some(*o),
            Err(e) => {
                if cfg!(debug_assertions) {
                    panic!("{e}");
                }
                warn!("dropping invalid observation: {e}");
                None
            }
        })
        .collect()
}

/// Predict with the default configuration.
pub fn predict_delivery(observations: &[Observation]) -> Prediction {
    DeliveryPredictor::new().predict(observations)
}
