//! Delivery prediction and the chart-facing funnel analysis.

mod funnel;
mod predictor;

pub use funnel::FunnelAnalysis;
pub use predictor::{predict_delivery, ConfidenceGrade, DeliveryPredictor, Prediction};
