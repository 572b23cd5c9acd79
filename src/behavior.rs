use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::error::DomainError;
use crate::models::{BehaviorEvent, BehaviorSummary, Severity, WeeklyTrend};

const TOP_LIST_LEN: usize = 5;

// Severity and duration are independent axes: a long low-severity event and
// a zero-second high-severity event are both valid records.
pub fn validate_event(event: &BehaviorEvent) -> Result<(), DomainError> {
    if event.duration_seconds < 0 {
        return Err(DomainError::InvalidEvent(format!(
            "duration_seconds must be >= 0, got {}",
            event.duration_seconds
        )));
    }
    if event.behavior.trim().is_empty() {
        return Err(DomainError::InvalidEvent(
            "behavior description is empty".to_string(),
        ));
    }
    if let Some(rating) = event.effectiveness_rating {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::InvalidEvent(format!(
                "effectiveness_rating must be between 1 and 5, got {rating}"
            )));
        }
    }
    Ok(())
}

pub fn cutoff_date(since_days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(since_days.max(1))
}

// Exact-string grouping only; free-text normalization belongs upstream.
pub fn summarize(events: &[BehaviorEvent]) -> BehaviorSummary {
    let mut low = 0;
    let mut medium = 0;
    let mut high = 0;
    let mut antecedents: HashMap<String, usize> = HashMap::new();
    let mut interventions: HashMap<String, usize> = HashMap::new();
    let mut rating_sum = 0i64;
    let mut rating_count = 0usize;

    for event in events {
        match event.severity {
            Severity::Low => low += 1,
            Severity::Medium => medium += 1,
            Severity::High => high += 1,
        }
        if !event.antecedent.trim().is_empty() {
            *antecedents.entry(event.antecedent.clone()).or_insert(0) += 1;
        }
        for intervention in &event.interventions {
            *interventions.entry(intervention.clone()).or_insert(0) += 1;
        }
        if let Some(rating) = event.effectiveness_rating {
            rating_sum += i64::from(rating);
            rating_count += 1;
        }
    }

    BehaviorSummary {
        total_events: events.len(),
        low,
        medium,
        high,
        top_antecedents: ranked(antecedents),
        top_interventions: ranked(interventions),
        avg_effectiveness: if rating_count == 0 {
            None
        } else {
            Some(rating_sum as f64 / rating_count as f64)
        },
    }
}

fn ranked(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_LIST_LEN);
    entries
}

// Events bucketed by the Monday of their week, oldest first.
pub fn weekly_trends(events: &[BehaviorEvent]) -> Vec<WeeklyTrend> {
    let mut weeks: HashMap<NaiveDate, (usize, usize)> = HashMap::new();

    for event in events {
        let date = event.occurred_at.date_naive();
        let week_start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let entry = weeks.entry(week_start).or_insert((0, 0));
        entry.0 += 1;
        if event.severity == Severity::High {
            entry.1 += 1;
        }
    }

    let mut trends: Vec<WeeklyTrend> = weeks
        .into_iter()
        .map(|(week_start, (event_count, high_severity))| WeeklyTrend {
            week_start,
            event_count,
            high_severity,
        })
        .collect();
    trends.sort_by_key(|trend| trend.week_start);
    trends
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn sample_event(severity: Severity, duration_seconds: i64) -> BehaviorEvent {
        BehaviorEvent {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            goal_id: None,
            occurred_at: Utc.with_ymd_and_hms(2026, 2, 3, 10, 15, 0).unwrap(),
            antecedent: "Transition from recess to math".to_string(),
            behavior: "Left assigned area".to_string(),
            consequence: "Redirected to seat with visual timer".to_string(),
            severity,
            duration_seconds,
            location: "Classroom".to_string(),
            environmental_factors: vec!["noisy hallway".to_string()],
            interventions: vec!["redirect".to_string()],
            effectiveness_rating: Some(4),
            follow_up_needed: false,
            follow_up_notes: None,
        }
    }

    #[test]
    fn negative_duration_is_rejected() {
        let event = sample_event(Severity::Low, -1);
        assert!(matches!(
            validate_event(&event),
            Err(DomainError::InvalidEvent(_))
        ));
    }

    #[test]
    fn zero_duration_high_severity_event_is_accepted() {
        let event = sample_event(Severity::High, 0);
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let mut event = sample_event(Severity::Medium, 30);
        event.effectiveness_rating = Some(6);
        assert!(matches!(
            validate_event(&event),
            Err(DomainError::InvalidEvent(_))
        ));
        event.effectiveness_rating = Some(0);
        assert!(matches!(
            validate_event(&event),
            Err(DomainError::InvalidEvent(_))
        ));
    }

    #[test]
    fn missing_rating_is_allowed() {
        let mut event = sample_event(Severity::Low, 30);
        event.effectiveness_rating = None;
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn summary_counts_by_severity_and_groups_exact_strings() {
        let mut events = vec![
            sample_event(Severity::Low, 30),
            sample_event(Severity::Low, 45),
            sample_event(Severity::High, 10),
        ];
        events[2].antecedent = "Asked to start worksheet".to_string();
        events[2].interventions = vec!["break".to_string(), "redirect".to_string()];

        let summary = summarize(&events);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.low, 2);
        assert_eq!(summary.medium, 0);
        assert_eq!(summary.high, 1);
        assert_eq!(
            summary.top_antecedents[0],
            ("Transition from recess to math".to_string(), 2)
        );
        assert_eq!(summary.top_interventions[0], ("redirect".to_string(), 3));
        assert_eq!(summary.avg_effectiveness, Some(4.0));
    }

    #[test]
    fn summary_of_unrated_events_has_no_average() {
        let mut event = sample_event(Severity::Medium, 20);
        event.effectiveness_rating = None;
        let summary = summarize(&[event]);
        assert_eq!(summary.avg_effectiveness, None);
    }

    #[test]
    fn weekly_trends_bucket_by_monday() {
        let mut monday = sample_event(Severity::Low, 30);
        monday.occurred_at = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        let mut friday = sample_event(Severity::High, 30);
        friday.occurred_at = Utc.with_ymd_and_hms(2026, 2, 6, 14, 0, 0).unwrap();
        let mut next_week = sample_event(Severity::Low, 30);
        next_week.occurred_at = Utc.with_ymd_and_hms(2026, 2, 9, 9, 0, 0).unwrap();

        let trends = weekly_trends(&[monday, friday, next_week]);
        assert_eq!(trends.len(), 2);
        assert_eq!(
            trends[0].week_start,
            NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
        );
        assert_eq!(trends[0].event_count, 2);
        assert_eq!(trends[0].high_severity, 1);
        assert_eq!(
            trends[1].week_start,
            NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
        );
    }
}
