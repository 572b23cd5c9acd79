use crate::error::DomainError;
use crate::models::{
    DomainSummary, Goal, GoalArea, Measurement, MeasurementSpec, ProgressPoint, ProgressStatus,
};

pub const DEFAULT_TREND_WINDOW: usize = 4;

// Scale a measured value onto the 0-100 progress axis declared by the goal.
// Latency inverts: a response faster than the declared target counts as 100.
pub fn normalize(measurement: &Measurement, spec: &MeasurementSpec) -> Result<f64, DomainError> {
    match (measurement, spec) {
        (Measurement::Accuracy { correct, total }, MeasurementSpec::Accuracy) => {
            if *total == 0 {
                return Err(DomainError::InvalidMeasurement(
                    "accuracy trial with zero total".to_string(),
                ));
            }
            if correct > total {
                return Err(DomainError::InvalidMeasurement(format!(
                    "accuracy trial reports {correct} correct out of {total}"
                )));
            }
            Ok(f64::from(*correct) / f64::from(*total) * 100.0)
        }
        (Measurement::Frequency { value }, MeasurementSpec::Frequency { target }) => {
            scale_toward_target(*value, *target)
        }
        (Measurement::Duration { seconds }, MeasurementSpec::Duration { target_seconds }) => {
            scale_toward_target(*seconds, *target_seconds)
        }
        (Measurement::Latency { seconds }, MeasurementSpec::Latency { target_seconds }) => {
            if *target_seconds <= 0.0 {
                return Err(DomainError::InvalidMeasurement(
                    "latency goal declares a non-positive target".to_string(),
                ));
            }
            if *seconds <= 0.0 {
                return Ok(100.0);
            }
            Ok((target_seconds / seconds * 100.0).clamp(0.0, 100.0))
        }
        (Measurement::RawScore { value }, MeasurementSpec::RawScore) => {
            Ok(value.clamp(0.0, 100.0))
        }
        (measurement, spec) => Err(DomainError::InvalidMeasurement(format!(
            "goal measures {}, data point is {}",
            spec.kind(),
            measurement.kind()
        ))),
    }
}

fn scale_toward_target(value: f64, target: f64) -> Result<f64, DomainError> {
    if target <= 0.0 {
        return Err(DomainError::InvalidMeasurement(
            "goal declares a non-positive target".to_string(),
        ));
    }
    if value < 0.0 {
        return Err(DomainError::InvalidMeasurement(
            "measured value is negative".to_string(),
        ));
    }
    Ok((value / target * 100.0).clamp(0.0, 100.0))
}

// Gatekeeper for recording a point against a goal. Returns the normalized
// value on success so the caller can refresh the cached progress.
pub fn validate_point(goal: &Goal, measurement: &Measurement) -> Result<f64, DomainError> {
    if goal.state.is_closed() {
        return Err(DomainError::GoalClosed(goal.id));
    }
    normalize(measurement, &goal.measurement)
}

// Cached current_progress is the most recent point's normalized value.
pub fn recompute_progress(goal: &Goal, points: &[ProgressPoint]) -> Option<i32> {
    normalized_series(goal, points)
        .last()
        .map(|value| value.round().clamp(0.0, 100.0) as i32)
}

pub fn derive_status(goal: &Goal, points: &[ProgressPoint]) -> ProgressStatus {
    derive_status_with_window(goal, points, DEFAULT_TREND_WINDOW)
}

// Trend rule over the last `window` points, falling back to a scalar
// threshold check when fewer than two points exist. Goals are evaluated from
// day one, before any trend data has been collected.
pub fn derive_status_with_window(
    goal: &Goal,
    points: &[ProgressPoint],
    window: usize,
) -> ProgressStatus {
    let series = normalized_series(goal, points);
    if series.len() < 2 {
        let latest = series
            .last()
            .copied()
            .unwrap_or(f64::from(goal.current_progress));
        return scalar_status(latest, goal.target);
    }

    let window = window.max(2);
    let tail = &series[series.len().saturating_sub(window)..];
    let earliest = tail[0];
    let latest = tail[tail.len() - 1];
    let delta = latest - earliest;

    if delta > 10.0 {
        ProgressStatus::OnTrack
    } else if delta < 0.0 {
        ProgressStatus::AtRisk
    } else if latest < goal.target * 0.8 {
        ProgressStatus::NeedsAttention
    } else {
        ProgressStatus::OnTrack
    }
}

pub fn scalar_status(progress: f64, target: f64) -> ProgressStatus {
    if target <= 0.0 {
        return ProgressStatus::OnTrack;
    }
    if progress >= target * 0.8 {
        ProgressStatus::OnTrack
    } else if progress >= target * 0.5 {
        ProgressStatus::NeedsAttention
    } else {
        ProgressStatus::AtRisk
    }
}

// Aggregation reuses derive_status per goal so dashboards can never disagree
// with the per-goal view.
pub fn aggregate_by_domain(
    goals: &[(Goal, Vec<ProgressPoint>)],
    area: GoalArea,
) -> DomainSummary {
    let mut summary = DomainSummary {
        area,
        goal_count: 0,
        avg_progress: 0.0,
        on_track: 0,
        needs_attention: 0,
        at_risk: 0,
    };
    let mut total_progress = 0.0;

    for (goal, points) in goals.iter().filter(|(goal, _)| goal.area == area) {
        summary.goal_count += 1;
        total_progress += f64::from(goal.current_progress);
        match derive_status(goal, points) {
            ProgressStatus::OnTrack => summary.on_track += 1,
            ProgressStatus::NeedsAttention => summary.needs_attention += 1,
            ProgressStatus::AtRisk => summary.at_risk += 1,
        }
    }

    if summary.goal_count > 0 {
        summary.avg_progress = total_progress / summary.goal_count as f64;
    }
    summary
}

fn normalized_series(goal: &Goal, points: &[ProgressPoint]) -> Vec<f64> {
    let mut own: Vec<&ProgressPoint> = points
        .iter()
        .filter(|point| point.goal_id == goal.id)
        .collect();
    own.sort_by_key(|point| point.collected_on);
    own.iter()
        .filter_map(|point| normalize(&point.measurement, &goal.measurement).ok())
        .collect()
}
