use std::fmt::Write;

use chrono::NaiveDate;

use crate::behavior;
use crate::compliance;
use crate::models::{
    BehaviorEvent, ComplianceAlert, Goal, GoalArea, GoalState, Iep, ProgressPoint, Student,
};
use crate::progress;

pub fn build_report(
    student: &Student,
    iep: &Iep,
    goals: &[(Goal, Vec<ProgressPoint>)],
    events: &[BehaviorEvent],
    today: NaiveDate,
    cutoff: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# IEP Progress Report: {}", student.full_name());
    let _ = writeln!(
        output,
        "Grade {} | {} | Plan year {} (events since {})",
        student.grade_level, student.disability, iep.plan_year, cutoff
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Goals");

    if goals.is_empty() {
        let _ = writeln!(output, "No goals on the current IEP.");
    } else {
        for (goal, points) in goals {
            let status = match goal.state {
                GoalState::Active => progress::derive_status(goal, points).as_str().to_string(),
                GoalState::Closed { outcome, closed_on } => {
                    format!("{} on {}", outcome.as_str(), closed_on)
                }
            };
            let _ = writeln!(
                output,
                "- {} at {}% ({} data points, {}): {}",
                goal.area,
                goal.current_progress,
                points.len(),
                status,
                goal.statement
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Goal Areas");

    let mut areas: Vec<GoalArea> = goals.iter().map(|(goal, _)| goal.area).collect();
    areas.sort_by_key(|area| area.as_str());
    areas.dedup();

    if areas.is_empty() {
        let _ = writeln!(output, "No goal areas to aggregate.");
    } else {
        for area in areas {
            let summary = progress::aggregate_by_domain(goals, area);
            let _ = writeln!(
                output,
                "- {}: avg {:.0}% | {} on-track, {} needs-attention, {} at-risk",
                summary.area,
                summary.avg_progress,
                summary.on_track,
                summary.needs_attention,
                summary.at_risk
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Behavior");

    if events.is_empty() {
        let _ = writeln!(output, "No behavior events recorded for this window.");
    } else {
        let summary = behavior::summarize(events);
        let _ = writeln!(
            output,
            "{} events ({} low, {} medium, {} high)",
            summary.total_events, summary.low, summary.medium, summary.high
        );
        if let Some(avg) = summary.avg_effectiveness {
            let _ = writeln!(output, "Average intervention effectiveness {avg:.1}/5");
        }
        for (antecedent, count) in summary.top_antecedents.iter().take(3) {
            let _ = writeln!(output, "- antecedent: {antecedent} ({count}x)");
        }
        for (intervention, count) in summary.top_interventions.iter().take(3) {
            let _ = writeln!(output, "- intervention: {intervention} ({count}x)");
        }

        let trends = behavior::weekly_trends(events);
        if trends.len() > 1 {
            let _ = writeln!(output);
            let _ = writeln!(output, "Weekly trend:");
            for trend in trends {
                let _ = writeln!(
                    output,
                    "- week of {}: {} events ({} high severity)",
                    trend.week_start, trend.event_count, trend.high_severity
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Compliance");

    let alerts = compliance::check_compliance(iep, student, today);
    write_alerts(&mut output, &alerts);

    let mut recent_notes: Vec<&ProgressPoint> = goals
        .iter()
        .flat_map(|(_, points)| points.iter())
        .filter(|point| !point.note.trim().is_empty())
        .collect();
    recent_notes.sort_by(|a, b| b.collected_on.cmp(&a.collected_on));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Progress Notes");

    if recent_notes.is_empty() {
        let _ = writeln!(output, "No progress notes recorded.");
    } else {
        for point in recent_notes.iter().take(5) {
            let _ = writeln!(output, "- {}: {}", point.collected_on, point.note);
        }
    }

    output
}

fn write_alerts(output: &mut String, alerts: &[ComplianceAlert]) {
    if alerts.is_empty() {
        let _ = writeln!(output, "No obligations tracked.");
        return;
    }
    for alert in alerts {
        let _ = writeln!(
            output,
            "- {}: {} ({})",
            alert.obligation.as_str(),
            alert.due_date,
            alert.status.as_str()
        );
    }
}
