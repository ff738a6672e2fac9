//! Weighted least-squares curve fitting.
//!
//! Polynomial and exponential fits normalise x into `[0, 1]` before
//! building their sums, so epoch-millisecond timestamps do not blow up the
//! normal equations. [`FittedCurve::predict`] always takes raw x.

use serde::{Deserialize, Serialize};

use super::solver::{solve, PIVOT_EPSILON};
use crate::error::FitError;

/// Exponential fits win only when their RMSE beats the polynomial's by 5%.
pub const DEFAULT_EXPONENTIAL_MARGIN: f64 = 0.95;

/// A single `(x, y)` sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Model family of a fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    Polynomial,
    Exponential,
    Linear,
}

/// Affine map from raw x into the `[0, 1]` fitting domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min: f64,
    pub range: f64,
}

impl Domain {
    /// Domain that leaves x untouched.
    pub const IDENTITY: Domain = Domain { min: 0.0, range: 1.0 };

    /// Domain spanning the x extent of `points`. A zero-width extent maps
    /// every point to 0.
    pub fn of(points: &[Point]) -> Self {
        let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.x), hi.max(p.x))
        });
        if !min.is_finite() {
            return Self::IDENTITY;
        }
        let range = max - min;
        Self {
            min,
            range: if range > 0.0 { range } else { 1.0 },
        }
    }

    #[inline]
    pub fn normalize(&self, x: f64) -> f64 {
        (x - self.min) / self.range
    }
}

/// An immutable fitted model.
///
/// Coefficient layout by kind:
/// - `Polynomial`: `[a, b, c]` for `a + b·xₙ + c·xₙ²`
/// - `Exponential`: `[a, b]` for `a·e^(b·xₙ)`
/// - `Linear`: `[intercept, slope]` on raw x
///
/// A curve with no coefficients is degenerate and predicts 0 everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCurve {
    pub kind: CurveKind,
    pub coefficients: Vec<f64>,
    pub domain: Domain,
}

impl FittedCurve {
    /// The always-zero predictor used when a fit has too little data.
    pub fn degenerate(kind: CurveKind) -> Self {
        Self {
            kind,
            coefficients: Vec::new(),
            domain: Domain::IDENTITY,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Evaluate the curve at raw `x`.
    pub fn predict(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        let c = &self.coefficients;
        match self.kind {
            CurveKind::Polynomial => {
                let xn = self.domain.normalize(x);
                c[0] + c[1] * xn + c[2] * xn * xn
            }
            CurveKind::Exponential => c[0] * (c[1] * self.domain.normalize(x)).exp(),
            CurveKind::Linear => c[0] + c[1] * x,
        }
    }
}

/// Straight-line fit with the point where it reaches zero, if decaying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub curve: FittedCurve,
    pub slope: f64,
    pub intercept: f64,
    /// x where the line hits zero; only reported for negative slopes.
    pub zero_crossing: Option<f64>,
}

/// Weight of the `i`-th of `n` chronological points: a linear ramp from 1
/// (oldest) to 10 (newest).
pub fn ramp_weight(i: usize, n: usize) -> f64 {
    let span = if n > 1 { (n - 1) as f64 } else { 1.0 };
    1.0 + 9.0 * (i as f64 / span)
}

/// Fits polynomial and exponential models, optionally favouring recent points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveFitter {
    /// Ramp weights from 1 to 10 across the chronological index
    pub weighted: bool,
    /// Exponential is chosen only if `rmse_exp < rmse_poly * margin`
    pub exponential_margin: f64,
}

impl Default for CurveFitter {
    fn default() -> Self {
        Self::new()
    }
}

impl CurveFitter {
    /// Unweighted fitter with the default exponential margin.
    pub fn new() -> Self {
        Self {
            weighted: false,
            exponential_margin: DEFAULT_EXPONENTIAL_MARGIN,
        }
    }

    /// Fitter that ramps weights toward the most recent points.
    pub fn weighted() -> Self {
        Self {
            weighted: true,
            ..Self::new()
        }
    }

    pub fn with_settings(weighted: bool, exponential_margin: f64) -> Self {
        Self {
            weighted,
            exponential_margin,
        }
    }

    fn weight(&self, i: usize, n: usize) -> f64 {
        if self.weighted {
            ramp_weight(i, n)
        } else {
            1.0
        }
    }

    /// Fit `y = a + b·xₙ + c·xₙ²` by weighted least squares.
    pub fn fit_polynomial(&self, points: &[Point]) -> Result<FittedCurve, FitError> {
        if points.len() < 3 {
            return Err(FitError::InsufficientData {
                got: points.len(),
                min: 3,
            });
        }

        let domain = Domain::of(points);
        let n = points.len();

        // Σw·xᵏ for k = 0..=4 and Σw·xᵏ·y for k = 0..=2
        let mut sx = [0.0_f64; 5];
        let mut sxy = [0.0_f64; 3];
        for (i, p) in points.iter().enumerate() {
            let w = self.weight(i, n);
            let x = domain.normalize(p.x);
            let mut xk = 1.0;
            for k in 0..5 {
                sx[k] += w * xk;
                if k < 3 {
                    sxy[k] += w * xk * p.y;
                }
                xk *= x;
            }
        }

        let matrix = [
            [sx[0], sx[1], sx[2]],
            [sx[1], sx[2], sx[3]],
            [sx[2], sx[3], sx[4]],
        ];
        let coeffs = solve(matrix, sxy)?;

        Ok(FittedCurve {
            kind: CurveKind::Polynomial,
            coefficients: coeffs.to_vec(),
            domain,
        })
    }

    /// Fit `y = a·e^(b·xₙ)` by regressing `ln y` on `xₙ`.
    ///
    /// Points with `y ≤ 0` cannot be log-transformed and are skipped; the
    /// weight ramp runs over the remaining points.
    pub fn fit_exponential(&self, points: &[Point]) -> Result<FittedCurve, FitError> {
        let valid: Vec<&Point> = points.iter().filter(|p| p.y > 0.0).collect();
        if points.len() < 2 || valid.len() < 2 {
            return Err(FitError::InsufficientData {
                got: valid.len(),
                min: 2,
            });
        }

        let domain = Domain::of(points);
        let n = valid.len();

        let (mut sw, mut swx, mut swy, mut swxy, mut swxx) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (i, p) in valid.iter().enumerate() {
            let w = self.weight(i, n);
            let x = domain.normalize(p.x);
            let y = p.y.ln();
            sw += w;
            swx += w * x;
            swy += w * y;
            swxy += w * x * y;
            swxx += w * x * x;
        }

        let denominator = sw * swxx - swx * swx;
        if !(denominator.abs() >= PIVOT_EPSILON) {
            return Err(FitError::SingularMatrix);
        }

        let slope = (sw * swxy - swx * swy) / denominator;
        let intercept = (swy - slope * swx) / sw;

        Ok(FittedCurve {
            kind: CurveKind::Exponential,
            coefficients: vec![intercept.exp(), slope],
            domain,
        })
    }

    /// Fit both models and keep the better one by weighted RMSE.
    ///
    /// The polynomial is preferred unless the exponential is clearly better.
    /// If only one model can be fitted it is returned; if neither can, the
    /// polynomial's error is returned.
    pub fn fit_best(&self, points: &[Point]) -> Result<FittedCurve, FitError> {
        match (self.fit_polynomial(points), self.fit_exponential(points)) {
            (Ok(poly), Ok(exp)) => {
                let rmse_poly = self.weighted_rmse(points, &poly);
                let rmse_exp = self.weighted_rmse(points, &exp);
                if rmse_exp < rmse_poly * self.exponential_margin {
                    Ok(exp)
                } else {
                    Ok(poly)
                }
            }
            (Ok(poly), Err(_)) => Ok(poly),
            (Err(_), Ok(exp)) => Ok(exp),
            (Err(err), Err(_)) => Err(err),
        }
    }

    /// Root mean squared error of `curve` against `points`, weighted the
    /// same way the fit was.
    pub fn weighted_rmse(&self, points: &[Point], curve: &FittedCurve) -> f64 {
        let n = points.len();
        let (sum_sq, sum_w) = points.iter().enumerate().fold((0.0, 0.0), |(sq, sw), (i, p)| {
            let w = self.weight(i, n);
            let err = p.y - curve.predict(p.x);
            (sq + w * err * err, sw + w)
        });
        if sum_w > 0.0 {
            (sum_sq / sum_w).sqrt()
        } else {
            f64::INFINITY
        }
    }
}

/// Ordinary least-squares line on raw x.
///
/// Sums are taken about the means so large x values (timestamps) stay
/// well-conditioned; the returned coefficients are in raw x.
pub fn fit_linear(points: &[Point]) -> Result<LinearFit, FitError> {
    if points.len() < 2 {
        return Err(FitError::InsufficientData {
            got: points.len(),
            min: 2,
        });
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
        let dx = p.x - mean_x;
        (sxx + dx * dx, sxy + dx * (p.y - mean_y))
    });
    if !(sxx >= PIVOT_EPSILON) {
        return Err(FitError::SingularMatrix);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    Ok(LinearFit {
        curve: FittedCurve {
            kind: CurveKind::Linear,
            coefficients: vec![intercept, slope],
            domain: Domain::IDENTITY,
        },
        slope,
        intercept,
        zero_crossing: (slope < 0.0).then(|| -intercept / slope),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(data: &[(f64, f64)]) -> Vec<Point> {
        data.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn assert_reproduces(curve: &FittedCurve, points: &[Point], tol: f64) {
        for p in points {
            let y = curve.predict(p.x);
            assert!(
                (y - p.y).abs() < tol,
                "at x={} expected {}, got {}",
                p.x,
                p.y,
                y
            );
        }
    }

    #[test]
    fn ramp_weight_spans_one_to_ten() {
        assert_eq!(ramp_weight(0, 5), 1.0);
        assert_eq!(ramp_weight(4, 5), 10.0);
        assert!((ramp_weight(2, 5) - 5.5).abs() < 1e-12);
        assert_eq!(ramp_weight(0, 1), 1.0);
    }

    #[test]
    fn domain_normalizes_to_unit_interval() {
        let d = Domain::of(&pts(&[(10.0, 0.0), (30.0, 0.0), (20.0, 0.0)]));
        assert_eq!(d.normalize(10.0), 0.0);
        assert_eq!(d.normalize(30.0), 1.0);
        assert_eq!(d.normalize(20.0), 0.5);
    }

    #[test]
    fn domain_of_constant_x_uses_unit_range() {
        let d = Domain::of(&pts(&[(5.0, 1.0), (5.0, 2.0)]));
        assert_eq!(d.range, 1.0);
        assert_eq!(d.normalize(5.0), 0.0);
    }

    #[test]
    fn polynomial_reproduces_three_points() {
        let points = pts(&[(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]);
        for fitter in [CurveFitter::new(), CurveFitter::weighted()] {
            let curve = fitter.fit_polynomial(&points).unwrap();
            assert_eq!(curve.kind, CurveKind::Polynomial);
            assert_reproduces(&curve, &points, 1e-9);
        }
    }

    #[test]
    fn polynomial_handles_timestamp_scale_x() {
        let base = 1_700_000_000_000.0;
        let points = pts(&[
            (base, 40.0),
            (base + 300_000.0, 50.0),
            (base + 600_000.0, 70.0),
        ]);
        let curve = CurveFitter::weighted().fit_polynomial(&points).unwrap();
        assert_reproduces(&curve, &points, 1e-6);
    }

    #[test]
    fn polynomial_recovers_exact_quadratic() {
        let points: Vec<Point> = (0..8)
            .map(|i| {
                let x = i as f64;
                Point::new(x, 2.0 - 0.5 * x + 0.25 * x * x)
            })
            .collect();
        let curve = CurveFitter::weighted().fit_polynomial(&points).unwrap();
        assert_reproduces(&curve, &points, 1e-8);
        assert!((curve.predict(10.0) - (2.0 - 5.0 + 25.0)).abs() < 1e-6);
    }

    #[test]
    fn polynomial_needs_three_points() {
        let points = pts(&[(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(
            CurveFitter::new().fit_polynomial(&points),
            Err(FitError::InsufficientData { got: 2, min: 3 })
        );
    }

    #[test]
    fn polynomial_with_identical_x_is_singular() {
        let points = pts(&[(5.0, 1.0), (5.0, 2.0), (5.0, 3.0)]);
        assert_eq!(
            CurveFitter::new().fit_polynomial(&points),
            Err(FitError::SingularMatrix)
        );
    }

    #[test]
    fn exponential_reproduces_two_points() {
        let points = pts(&[(0.0, 2.0), (10.0, 8.0)]);
        let curve = CurveFitter::new().fit_exponential(&points).unwrap();
        assert_eq!(curve.kind, CurveKind::Exponential);
        assert_reproduces(&curve, &points, 1e-9);
    }

    #[test]
    fn exponential_recovers_log_linear_data() {
        let points: Vec<Point> = (0..6)
            .map(|i| Point::new(i as f64 * 60.0, 3.0 * (0.4 * i as f64).exp()))
            .collect();
        let curve = CurveFitter::weighted().fit_exponential(&points).unwrap();
        assert_reproduces(&curve, &points, 1e-8);
    }

    #[test]
    fn exponential_skips_non_positive_values() {
        let points = pts(&[(0.0, 0.0), (1.0, 2.0), (2.0, -1.0), (3.0, 8.0)]);
        let curve = CurveFitter::new().fit_exponential(&points).unwrap();
        assert!((curve.predict(1.0) - 2.0).abs() < 1e-9);
        assert!((curve.predict(3.0) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn exponential_needs_two_positive_points() {
        let points = pts(&[(0.0, 0.0), (1.0, 2.0), (2.0, 0.0)]);
        assert_eq!(
            CurveFitter::new().fit_exponential(&points),
            Err(FitError::InsufficientData { got: 1, min: 2 })
        );
    }

    #[test]
    fn best_prefers_polynomial_on_ties() {
        // Three points: the quadratic is exact, so the exponential cannot win.
        let points = pts(&[(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]);
        let best = CurveFitter::weighted().fit_best(&points).unwrap();
        assert_eq!(best.kind, CurveKind::Polynomial);
    }

    #[test]
    fn best_picks_exponential_for_rapid_onset() {
        let points: Vec<Point> = (0..12)
            .map(|i| Point::new(i as f64, (0.6 * i as f64).exp()))
            .collect();
        let best = CurveFitter::weighted().fit_best(&points).unwrap();
        assert_eq!(best.kind, CurveKind::Exponential);
    }

    #[test]
    fn best_falls_back_to_exponential_when_polynomial_unavailable() {
        let points = pts(&[(0.0, 2.0), (1.0, 4.0)]);
        let best = CurveFitter::new().fit_best(&points).unwrap();
        assert_eq!(best.kind, CurveKind::Exponential);
    }

    #[test]
    fn best_uses_exponential_when_duplicate_x_make_polynomial_singular() {
        let points = pts(&[(0.0, 40.0), (0.0, 50.0), (150_000.0, 60.0)]);
        let fitter = CurveFitter::weighted();
        assert_eq!(fitter.fit_polynomial(&points), Err(FitError::SingularMatrix));
        let best = fitter.fit_best(&points).unwrap();
        assert_eq!(best.kind, CurveKind::Exponential);
    }

    #[test]
    fn best_falls_back_to_polynomial_when_exponential_unavailable() {
        let points = pts(&[(0.0, 0.0), (1.0, -1.0), (2.0, 0.0)]);
        let best = CurveFitter::new().fit_best(&points).unwrap();
        assert_eq!(best.kind, CurveKind::Polynomial);
    }

    #[test]
    fn best_reports_error_when_nothing_fits() {
        let points = pts(&[(0.0, 0.0)]);
        assert!(CurveFitter::new().fit_best(&points).is_err());
    }

    #[test]
    fn margin_controls_exponential_preference() {
        let points: Vec<Point> = (0..12)
            .map(|i| Point::new(i as f64, (0.6 * i as f64).exp()))
            .collect();
        // A margin of zero means the exponential can never be "better enough".
        let fitter = CurveFitter::with_settings(true, 0.0);
        assert_eq!(fitter.fit_best(&points).unwrap().kind, CurveKind::Polynomial);
    }

    #[test]
    fn weighted_rmse_is_zero_for_exact_fit() {
        let points = pts(&[(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]);
        let fitter = CurveFitter::weighted();
        let curve = fitter.fit_polynomial(&points).unwrap();
        assert!(fitter.weighted_rmse(&points, &curve) < 1e-9);
    }

    #[test]
    fn weighted_rmse_emphasises_recent_errors() {
        let points = pts(&[(0.0, 1.0), (1.0, 0.0)]);
        let zero = FittedCurve::degenerate(CurveKind::Polynomial);
        // errors: 1 at weight 1, 0 at weight 10
        let weighted = CurveFitter::weighted().weighted_rmse(&points, &zero);
        let plain = CurveFitter::new().weighted_rmse(&points, &zero);
        assert!((weighted - (1.0_f64 / 11.0).sqrt()).abs() < 1e-12);
        assert!((plain - 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn degenerate_curve_predicts_zero() {
        let curve = FittedCurve::degenerate(CurveKind::Exponential);
        assert!(curve.is_degenerate());
        assert_eq!(curve.predict(123.0), 0.0);
    }

    #[test]
    fn linear_fit_reports_zero_crossing_for_decay() {
        let points = pts(&[(0.0, 10.0), (1.0, 8.0), (2.0, 6.0)]);
        let fit = fit_linear(&points).unwrap();
        assert!((fit.slope + 2.0).abs() < 1e-12);
        assert!((fit.intercept - 10.0).abs() < 1e-12);
        assert!((fit.zero_crossing.unwrap() - 5.0).abs() < 1e-12);
        assert!((fit.curve.predict(4.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn linear_fit_has_no_zero_crossing_when_rising() {
        let points = pts(&[(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(fit_linear(&points).unwrap().zero_crossing, None);
    }

    #[test]
    fn linear_fit_rejects_vertical_data() {
        let points = pts(&[(1.0, 1.0), (1.0, 2.0)]);
        assert_eq!(fit_linear(&points), Err(FitError::SingularMatrix));
    }
}
