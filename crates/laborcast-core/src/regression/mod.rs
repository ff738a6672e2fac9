//! Regression primitives shared by the predictor and chart consumers.
//!
//! Charting code should fit through these functions rather than
//! re-deriving the math, so the drawn funnel always matches the reported
//! prediction.

mod fit;
pub mod solver;

pub use fit::{
    fit_linear, ramp_weight, CurveFitter, CurveKind, Domain, FittedCurve, LinearFit, Point,
    DEFAULT_EXPONENTIAL_MARGIN,
};
pub use solver::solve;
