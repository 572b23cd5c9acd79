use std::fmt::Write;

use anyhow::Context;
use reqwest::Client;
use serde_json::json;

use crate::models::{BehaviorEvent, Goal, GoalState, Iep, ProgressPoint, Student};
use crate::progress;

// Shown whenever the external assistant cannot be reached. The workflow
// never blocks on the assistant being up.
pub const FALLBACK_REPLY: &str = "The assistant is unavailable right now. The student's \
current goal progress, behavior summary, and compliance alerts are available through the \
status, summarize, and report commands.";

const SYSTEM_PROMPT: &str = "You are an assistant for a special-education team. Answer \
using the student context below. Be concrete and practical; suggest evidence-based \
strategies where relevant, and never invent data that is not in the context.";

// Flattens the student's plan into prompt text for the chat completion.
// The assistant consumes a string and returns a string; nothing here depends
// on the response shape beyond that.
pub fn build_context(
    student: &Student,
    iep: &Iep,
    goals: &[(Goal, Vec<ProgressPoint>)],
    events: &[BehaviorEvent],
) -> String {
    let mut context = String::new();

    let _ = writeln!(context, "=== STUDENT IEP CONTEXT ===");
    let _ = writeln!(
        context,
        "Student: {} (Grade {})",
        student.full_name(),
        student.grade_level
    );
    let _ = writeln!(context, "Primary Disability: {}", student.disability);
    let _ = writeln!(context);

    if !iep.present_levels.trim().is_empty() {
        let _ = writeln!(context, "Present Levels of Performance:");
        let _ = writeln!(context, "{}", iep.present_levels);
        let _ = writeln!(context);
    }

    if !goals.is_empty() {
        let _ = writeln!(context, "Current IEP Goals:");
        for (index, (goal, points)) in goals.iter().enumerate() {
            let _ = writeln!(context, "{}. {}: {}", index + 1, goal.area, goal.statement);
            let status = match goal.state {
                GoalState::Active => progress::derive_status(goal, points).to_string(),
                GoalState::Closed { outcome, .. } => outcome.as_str().to_string(),
            };
            let _ = writeln!(
                context,
                "   Progress: {}% | Status: {} | Target: {:.0}%",
                goal.current_progress, status, goal.target
            );
        }
        let _ = writeln!(context);
    }

    let mut recent_points: Vec<(&Goal, &ProgressPoint)> = goals
        .iter()
        .flat_map(|(goal, points)| points.iter().map(move |point| (goal, point)))
        .filter(|(_, point)| !point.note.trim().is_empty())
        .collect();
    recent_points.sort_by(|a, b| b.1.collected_on.cmp(&a.1.collected_on));

    if !recent_points.is_empty() {
        let _ = writeln!(context, "Recent Progress Updates:");
        for (goal, point) in recent_points.iter().take(5) {
            let _ = writeln!(
                context,
                "- {}: {} ({})",
                goal.area, point.note, point.collected_on
            );
        }
        let _ = writeln!(context);
    }

    if !events.is_empty() {
        let mut recent: Vec<&BehaviorEvent> = events.iter().collect();
        recent.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        let _ = writeln!(context, "Recent Behavior Events:");
        for event in recent.iter().take(3) {
            let _ = writeln!(
                context,
                "- {}: {} ({} severity)",
                event.occurred_at.date_naive(),
                event.behavior,
                event.severity
            );
            if !event.antecedent.trim().is_empty() {
                let _ = writeln!(context, "  Antecedent: {}", event.antecedent);
            }
            if !event.consequence.trim().is_empty() {
                let _ = writeln!(context, "  Consequence: {}", event.consequence);
            }
        }
    }

    context
}

pub async fn ask(question: &str, context: &str) -> String {
    match request_completion(question, context).await {
        Ok(reply) => reply,
        Err(error) => {
            tracing::warn!("assistant request failed, using fallback: {error:#}");
            FALLBACK_REPLY.to_string()
        }
    }
}

async fn request_completion(question: &str, context: &str) -> anyhow::Result<String> {
    let base_url =
        std::env::var("AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let api_key = std::env::var("AI_API_KEY").ok();

    let body = json!({
        "model": model,
        "messages": [
            { "role": "system", "content": format!("{SYSTEM_PROMPT}\n\n{context}") },
            { "role": "user", "content": question },
        ],
        "temperature": 0.7,
    });

    let mut request = Client::new()
        .post(format!(
            "{}/chat/completions",
            base_url.trim_end_matches('/')
        ))
        .json(&body);
    if let Some(ref key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await?.error_for_status()?;
    let payload: serde_json::Value = response.json().await?;
    let content = payload["choices"][0]["message"]["content"]
        .as_str()
        .context("completion response has no content")?;
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DisabilityCategory, GoalArea, IepStatus, Measurement, MeasurementSpec, PromptLevel,
        Severity,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn fixtures() -> (Student, Iep, Vec<(Goal, Vec<ProgressPoint>)>, Vec<BehaviorEvent>) {
        let student = Student {
            id: Uuid::new_v4(),
            first_name: "Emma".to_string(),
            last_name: "Johnson".to_string(),
            grade_level: "2".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2018, 4, 12).unwrap(),
            disability: DisabilityCategory::SpecificLearningDisability,
            organization: "Jefferson Elementary".to_string(),
        };
        let iep = Iep {
            id: Uuid::new_v4(),
            student_id: student.id,
            plan_year: "2025-2026".to_string(),
            effective_date: NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
            annual_review_date: NaiveDate::from_ymd_opt(2026, 9, 2).unwrap(),
            triennial_evaluation_date: NaiveDate::from_ymd_opt(2027, 9, 2).unwrap(),
            disability: student.disability,
            present_levels: "Emma reads at a beginning 2nd grade level.".to_string(),
            transition_plan: None,
            status: IepStatus::Active,
            amendments: Vec::new(),
        };
        let goal = Goal {
            id: Uuid::new_v4(),
            iep_id: iep.id,
            area: GoalArea::AcademicReading,
            statement: "Read passages with 95% accuracy".to_string(),
            baseline: 45.0,
            target: 80.0,
            measurement: MeasurementSpec::Accuracy,
            evaluation_method: "CBM probes".to_string(),
            evaluation_schedule: "monthly".to_string(),
            current_progress: 58,
            state: GoalState::Active,
            version: 0,
        };
        let point = ProgressPoint {
            id: Uuid::new_v4(),
            goal_id: goal.id,
            collected_on: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
            measurement: Measurement::Accuracy {
                correct: 15,
                total: 26,
            },
            prompt_level: PromptLevel::Independent,
            mastery_criteria_met: false,
            note: "First independent probe above baseline".to_string(),
        };
        let event = BehaviorEvent {
            id: Uuid::new_v4(),
            student_id: student.id,
            goal_id: None,
            occurred_at: Utc.with_ymd_and_hms(2025, 11, 5, 13, 10, 0).unwrap(),
            antecedent: "Independent writing task assigned".to_string(),
            behavior: "Put head down and pushed paper away".to_string(),
            consequence: "Teacher chunked the task".to_string(),
            severity: Severity::Low,
            duration_seconds: 120,
            location: "Classroom 12".to_string(),
            environmental_factors: Vec::new(),
            interventions: vec!["task chunking".to_string()],
            effectiveness_rating: Some(5),
            follow_up_needed: false,
            follow_up_notes: None,
        };
        (student, iep, vec![(goal, vec![point])], vec![event])
    }

    #[test]
    fn context_carries_goals_progress_and_behavior() {
        let (student, iep, goals, events) = fixtures();
        let context = build_context(&student, &iep, &goals, &events);

        assert!(context.contains("Emma Johnson"));
        assert!(context.contains("specific-learning-disability"));
        assert!(context.contains("academic-reading: Read passages with 95% accuracy"));
        assert!(context.contains("Progress: 58%"));
        assert!(context.contains("First independent probe above baseline"));
        assert!(context.contains("Antecedent: Independent writing task assigned"));
    }

    #[test]
    fn context_omits_empty_sections() {
        let (student, mut iep, _, _) = fixtures();
        iep.present_levels = String::new();
        let context = build_context(&student, &iep, &[], &[]);

        assert!(!context.contains("Present Levels"));
        assert!(!context.contains("Current IEP Goals"));
        assert!(!context.contains("Recent Behavior Events"));
    }
}
