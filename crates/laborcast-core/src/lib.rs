//! # Laborcast Core Library
//!
//! This library provides the prediction engine behind the Laborcast
//! contraction timer. It turns a list of timed contractions into an
//! estimated delivery time, and does nothing else: recording contractions,
//! persisting sessions, and drawing charts belong to the callers.
//!
//! ## Architecture
//!
//! - **Regression**: Gaussian elimination plus weighted polynomial and
//!   exponential fits with best-of model selection
//! - **Envelope**: Rolling mean ± 2σ band over contraction durations
//! - **Active phase**: Detection of the sustained short-gap regime so early,
//!   irregular contractions are left out of the fits
//! - **Prediction**: Forward projection of the fitted band edges to the
//!   point where they meet, with a confidence grade
//!
//! ## Key Components
//!
//! - [`DeliveryPredictor`]: Single-shot prediction pipeline
//! - [`FunnelAnalysis`]: The same pipeline's intermediate results for charts
//! - [`LaborSummary`]: Averages, trend and wording around a prediction
//! - [`Config`]: Tuning constants, persisted as TOML

pub mod active_phase;
pub mod config;
pub mod envelope;
pub mod error;
pub mod observation;
pub mod prediction;
pub mod regression;
pub mod summary;

pub use active_phase::ActivePhaseDetector;
pub use config::Config;
pub use envelope::{EnvelopeBand, EnvelopeBuilder};
pub use error::{ConfigError, CoreError, FitError, ValidationError};
pub use observation::{ContractionRecord, Observation};
pub use prediction::{
    predict_delivery, ConfidenceGrade, DeliveryPredictor, FunnelAnalysis, Prediction,
};
pub use regression::{CurveFitter, CurveKind, FittedCurve, Point};
pub use summary::{LaborSummary, LaborTrend};
