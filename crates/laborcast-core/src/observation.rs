//! Contraction observations and the records they are derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::regression::Point;

/// One completed contraction: when it started and how long it lasted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: DateTime<Utc>,
    /// Duration in seconds (finite, non-negative)
    pub duration_secs: f64,
}

impl Observation {
    pub fn new(time: DateTime<Utc>, duration_secs: f64) -> Self {
        Self {
            time,
            duration_secs,
        }
    }

    /// A zero duration means the contraction was never timed to its end.
    pub fn has_duration(&self) -> bool {
        self.duration_secs > 0.0
    }

    /// Check the finite, non-negative duration precondition.
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if !self.duration_secs.is_finite() {
            return Err(ValidationError::InvalidObservation {
                index,
                reason: format!("duration is not finite ({})", self.duration_secs),
            });
        }
        if self.duration_secs < 0.0 {
            return Err(ValidationError::InvalidObservation {
                index,
                reason: format!("duration is negative ({})", self.duration_secs),
            });
        }
        Ok(())
    }

    /// Numeric form: x is epoch milliseconds, y is seconds.
    pub fn to_point(&self) -> Point {
        Point::new(self.time.timestamp_millis() as f64, self.duration_secs)
    }
}

/// Validate every observation, reporting the first violation.
pub fn validate_all(observations: &[Observation]) -> Result<(), ValidationError> {
    observations
        .iter()
        .enumerate()
        .try_for_each(|(i, o)| o.validate(i))
}

/// A contraction as a timer records it; `end_time` is absent while it is
/// still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractionRecord {
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl ContractionRecord {
    pub fn new(start_time: DateTime<Utc>, end_time: Option<DateTime<Utc>>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Build a completed record after checking the end does not precede the start.
    pub fn completed(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if end_time < start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self::new(start_time, Some(end_time)))
    }

    /// Whole seconds between start and end, if ended.
    pub fn duration_secs(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds())
    }

    /// Ended with a positive duration.
    pub fn is_completed(&self) -> bool {
        self.duration_secs().is_some_and(|d| d > 0)
    }

    pub fn to_observation(&self) -> Option<Observation> {
        let duration = self.duration_secs().filter(|&d| d > 0)?;
        Some(Observation::new(self.start_time, duration as f64))
    }
}

/// Observations for every completed record, in input order.
pub fn completed_observations(records: &[ContractionRecord]) -> Vec<Observation> {
    records
        .iter()
        .filter_map(ContractionRecord::to_observation)
        .collect()
}

/// Rest intervals in seconds: each record's start minus the previous
/// record's end, for records whose predecessor has ended.
pub fn rest_intervals(records: &[ContractionRecord]) -> Vec<i64> {
    records
        .windows(2)
        .filter_map(|pair| {
            let prev_end = pair[0].end_time?;
            Some((pair[1].start_time - prev_end).num_seconds())
        })
        .collect()
}
