//! Human-facing labor summary built around a prediction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observation::{rest_intervals, ContractionRecord};
use crate::prediction::{ConfidenceGrade, Prediction};

/// Direction contractions are moving in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaborTrend {
    /// Rest intervals are shrinking
    Increasing,
    Stable,
    /// Rest intervals are growing
    Decreasing,
}

impl LaborTrend {
    /// Compare the last three rest intervals with the earliest ones.
    ///
    /// Needs at least three intervals and at least one earlier interval
    /// that is not among the last three; otherwise the trend is stable.
    pub fn from_intervals(intervals: &[i64]) -> Self {
        if intervals.len() < 3 {
            return LaborTrend::Stable;
        }
        let recent = &intervals[intervals.len() - 3..];
        let earlier = &intervals[..3.min(intervals.len() - 3)];
        if earlier.is_empty() {
            return LaborTrend::Stable;
        }

        let mean = |xs: &[i64]| xs.iter().sum::<i64>() as f64 / xs.len() as f64;
        let recent_avg = mean(recent);
        let earlier_avg = mean(earlier);

        if recent_avg < earlier_avg * 0.8 {
            LaborTrend::Increasing
        } else if recent_avg > earlier_avg * 1.2 {
            LaborTrend::Decreasing
        } else {
            LaborTrend::Stable
        }
    }
}

/// Prediction plus the averages and wording shown alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborSummary {
    pub estimated_time: Option<DateTime<Utc>>,
    pub confidence: ConfidenceGrade,
    /// Mean duration of completed contractions, in seconds
    pub avg_duration_secs: f64,
    /// Mean rest between contractions (end to next start), in seconds
    pub avg_interval_secs: f64,
    pub trend: LaborTrend,
    pub reasoning: String,
}

impl LaborSummary {
    /// Summarise a session. Returns `None` with fewer than three completed
    /// contractions.
    pub fn from_records(records: &[ContractionRecord], prediction: &Prediction) -> Option<Self> {
        let durations: Vec<i64> = records
            .iter()
            .filter(|r| r.is_completed())
            .filter_map(ContractionRecord::duration_secs)
            .collect();
        if durations.len() < 3 {
            return None;
        }

        let avg_duration_secs = durations.iter().sum::<i64>() as f64 / durations.len() as f64;
        let intervals = rest_intervals(records);
        let avg_interval_secs = if intervals.is_empty() {
            0.0
        } else {
            intervals.iter().sum::<i64>() as f64 / intervals.len() as f64
        };
        let trend = LaborTrend::from_intervals(&intervals);

        Some(Self {
            estimated_time: prediction.time,
            confidence: prediction.confidence,
            avg_duration_secs,
            avg_interval_secs,
            trend,
            reasoning: reasoning(prediction, trend),
        })
    }
}

fn reasoning(prediction: &Prediction, trend: LaborTrend) -> String {
    if !prediction.is_present() {
        return "Continue monitoring. Unable to calculate delivery prediction yet.".to_string();
    }

    let mut text = match prediction.confidence {
        ConfidenceGrade::High => {
            "Active labor phase detected. Contractions are frequent and strong."
        }
        ConfidenceGrade::Medium => {
            "Labor is progressing. Contractions are becoming more regular."
        }
        ConfidenceGrade::Low => "Early labor phase. Continue monitoring as patterns develop.",
    }
    .to_string();

    match trend {
        LaborTrend::Increasing => text.push_str(" Labor is progressing rapidly."),
        LaborTrend::Decreasing => text.push_str(" Labor progression has slowed."),
        LaborTrend::Stable => {}
    }
    text
}
