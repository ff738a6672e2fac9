//! Integration tests for the chart-facing funnel analysis.

use chrono::{Duration, TimeZone, Utc};
use laborcast_core::regression::CurveFitter;
use laborcast_core::{Config, DeliveryPredictor, EnvelopeBuilder, Observation};

fn session(durations: &[f64], gap_secs: i64) -> Vec<Observation> {
    let base = Utc.with_ymd_and_hms(2026, 5, 21, 3, 0, 0).unwrap();
    durations
        .iter()
        .enumerate()
        .map(|(i, &d)| Observation::new(base + Duration::seconds(gap_secs * i as i64), d))
        .collect()
}

#[test]
fn test_funnel_samples_align_with_active_points() {
    let obs = session(&[35.0, 48.0, 41.0, 55.0, 50.0, 62.0, 58.0, 66.0], 200);
    let analysis = DeliveryPredictor::new().analyze(&obs).unwrap();
    let active = analysis.active_points();

    assert_eq!(analysis.envelope.len(), active.len());
    assert_eq!(analysis.trend_line.len(), active.len());
    assert_eq!(analysis.upper_band.len(), active.len());
    assert_eq!(analysis.lower_band.len(), active.len());
    for (sample, p) in analysis.upper_band.iter().zip(active) {
        assert_eq!(sample.x, p.x);
    }
}

#[test]
fn test_band_samples_are_clamped_for_display() {
    // wide swings push the fitted upper edge past the cap and the lower below zero
    let obs = session(&[20.0, 170.0, 15.0, 175.0, 10.0, 180.0, 12.0, 178.0], 200);
    let analysis = DeliveryPredictor::new().analyze(&obs).unwrap();

    assert!(analysis.upper_band.iter().all(|p| p.y <= 180.0));
    assert!(analysis.lower_band.iter().all(|p| p.y >= 0.0));
    let steps = analysis.projected_lower.len() - usize::from(analysis.intersection.is_some());
    assert!(analysis.projected_lower[..steps].iter().all(|p| p.y >= 0.0));
}

#[test]
fn test_projection_starts_at_last_observation() {
    let obs = session(&[35.0, 48.0, 41.0, 55.0, 50.0, 62.0], 200);
    let analysis = DeliveryPredictor::new().analyze(&obs).unwrap();
    let last_x = analysis.points.last().unwrap().x;

    assert_eq!(analysis.projected_upper[0].x, last_x);
    assert_eq!(analysis.projected_lower[0].x, last_x);
    assert_eq!(analysis.projected_upper.len(), analysis.projected_lower.len());
    if let Some(crossing) = analysis.intersection {
        assert_eq!(analysis.projected_upper.last().unwrap(), &crossing);
        assert_eq!(analysis.projected_lower.last().unwrap(), &crossing);
    }
}

#[test]
fn test_funnel_uses_shared_primitives() {
    // a chart re-deriving the envelope from the public builders gets the same fits
    let obs = session(&[35.0, 48.0, 41.0, 55.0, 50.0, 62.0, 58.0], 200);
    let config = Config::default();
    let analysis = DeliveryPredictor::with_config(config.clone())
        .analyze(&obs)
        .unwrap();

    let envelope = EnvelopeBuilder::new().build(analysis.active_points());
    assert_eq!(envelope, analysis.envelope);

    let fitter: CurveFitter = config.curve_fitter();
    assert_eq!(fitter.fit_best(&envelope.upper).unwrap(), analysis.upper_fit);
    assert_eq!(fitter.fit_best(&envelope.lower).unwrap(), analysis.lower_fit);
}

#[test]
fn test_funnel_serializes_to_json() {
    let obs = session(&[40.0, 50.0, 60.0], 150);
    let analysis = DeliveryPredictor::new().analyze(&obs).unwrap();
    let json = serde_json::to_value(&analysis).unwrap();
    assert!(json["upper_fit"]["kind"].is_string());
    assert!(json["intersection"].is_object());
    assert_eq!(json["points"].as_array().unwrap().len(), 3);
}

#[test]
fn test_insufficient_data_has_no_funnel() {
    let obs = session(&[40.0, 50.0], 150);
    assert!(DeliveryPredictor::new().analyze(&obs).is_none());
}

#[test]
fn test_width_trend_tracks_narrowing_band() {
    // wild early swings settling into steady contractions
    let obs = session(
        &[20.0, 90.0, 25.0, 85.0, 40.0, 60.0, 48.0, 52.0, 50.0, 51.0],
        200,
    );
    let analysis = DeliveryPredictor::new().analyze(&obs).unwrap();
    let trend = analysis.width_trend.as_ref().expect("width trend fitted");

    assert!(trend.slope < 0.0);
    let closure = trend.zero_crossing.expect("narrowing band closes");
    assert!(closure > analysis.active_points()[0].x);
    assert!(analysis.width_closure_time().is_some());
}
