//! Funnel analysis: everything a chart needs to draw the envelope, its
//! forward projection, and the predicted crossing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::EnvelopeBand;
use crate::regression::{FittedCurve, LinearFit, Point};

/// Result of one pipeline run over a contraction series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelAnalysis {
    /// Completed observations, sorted by time (x = epoch ms, y = seconds)
    pub points: Vec<Point>,
    /// Index into `points` where the active phase starts
    pub active_start: usize,
    /// Rolling envelope over the active phase
    pub envelope: EnvelopeBand,
    /// Best fit through the active durations; display only
    pub trend_fit: Option<FittedCurve>,
    pub upper_fit: FittedCurve,
    pub lower_fit: FittedCurve,
    /// Trend fit sampled at each active observation
    pub trend_line: Vec<Point>,
    /// Upper fit sampled at each active observation, capped for display
    pub upper_band: Vec<Point>,
    /// Lower fit sampled at each active observation, floored at zero
    pub lower_band: Vec<Point>,
    /// Upper fit from the last observation to the crossing (or horizon)
    pub projected_upper: Vec<Point>,
    /// Lower fit (floored at zero) over the same steps
    pub projected_lower: Vec<Point>,
    /// Where the bands meet; y is the midpoint of the two fits there
    pub intersection: Option<Point>,
    /// Straight line through the envelope width over time. A negative
    /// slope's zero crossing is where the funnel closes if it keeps
    /// narrowing at the same rate.
    pub width_trend: Option<LinearFit>,
}

impl FunnelAnalysis {
    pub fn active_points(&self) -> &[Point] {
        &self.points[self.active_start..]
    }

    pub fn intersection_time(&self) -> Option<DateTime<Utc>> {
        self.intersection.and_then(|p| to_instant(p.x))
    }

    /// When the linear width trend reaches zero, if the band is narrowing.
    pub fn width_closure_time(&self) -> Option<DateTime<Utc>> {
        self.width_trend
            .as_ref()
            .and_then(|fit| fit.zero_crossing)
            .and_then(to_instant)
    }
}

/// Epoch milliseconds back to an instant, if representable.
pub(crate) fn to_instant(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(ms.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::CurveKind;

    fn analysis_with(
        points: Vec<Point>,
        active_start: usize,
        intersection: Option<Point>,
    ) -> FunnelAnalysis {
        FunnelAnalysis {
            points,
            active_start,
            envelope: EnvelopeBand::default(),
            trend_fit: None,
            upper_fit: FittedCurve::degenerate(CurveKind::Polynomial),
            lower_fit: FittedCurve::degenerate(CurveKind::Polynomial),
            trend_line: Vec::new(),
            upper_band: Vec::new(),
            lower_band: Vec::new(),
            projected_upper: Vec::new(),
            projected_lower: Vec::new(),
            intersection,
            width_trend: None,
        }
    }

    #[test]
    fn active_points_slice_from_start() {
        let points: Vec<Point> = (0..5).map(|i| Point::new(i as f64, 1.0)).collect();
        let analysis = analysis_with(points, 2, None);
        assert_eq!(analysis.active_points().len(), 3);
        assert_eq!(analysis.active_points()[0].x, 2.0);
    }

    #[test]
    fn intersection_time_rounds_millis() {
        let analysis = analysis_with(
            vec![Point::new(1_000.0, 1.0)],
            0,
            Some(Point::new(1_772_330_400_000.4, 50.0)),
        );
        let time = analysis.intersection_time().unwrap();
        assert_eq!(time.timestamp_millis(), 1_772_330_400_000);
    }

    #[test]
    fn width_closure_needs_a_narrowing_trend() {
        let mut analysis = analysis_with(vec![Point::new(0.0, 1.0)], 0, None);
        assert!(analysis.width_closure_time().is_none());

        let widening = [Point::new(0.0, 10.0), Point::new(60_000.0, 20.0)];
        analysis.width_trend = crate::regression::fit_linear(&widening).ok();
        assert!(analysis.width_closure_time().is_none());

        let narrowing = [Point::new(0.0, 20.0), Point::new(60_000.0, 10.0)];
        analysis.width_trend = crate::regression::fit_linear(&narrowing).ok();
        let closure = analysis.width_closure_time().unwrap();
        assert_eq!(closure.timestamp_millis(), 120_000);
    }

    #[test]
    fn non_finite_instant_is_absent() {
        assert!(to_instant(f64::NAN).is_none());
        assert!(to_instant(f64::INFINITY).is_none());
    }
}
