use anyhow::Context;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{MeasurementSpec, TransitionPlan};

// District-style demo fixtures: an elementary student with a specific
// learning disability and a high schooler with an open transition plan.
// Safe to run repeatedly.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let emma = Uuid::parse_str("7c9e6679-7425-40de-944b-e07fc1f90ae7")?;
    let marcus = Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?;

    let students = vec![
        (
            emma,
            "Emma",
            "Johnson",
            "2",
            NaiveDate::from_ymd_opt(2018, 4, 12).context("invalid date")?,
            "specific-learning-disability",
            "Jefferson Elementary",
        ),
        (
            marcus,
            "Marcus",
            "Williams",
            "10",
            NaiveDate::from_ymd_opt(2009, 6, 15).context("invalid date")?,
            "autism",
            "Jefferson High",
        ),
    ];

    for (id, first_name, last_name, grade, date_of_birth, disability, organization) in students {
        sqlx::query(
            r#"
            INSERT INTO accompli.students
            (id, first_name, last_name, grade_level, date_of_birth, disability, organization)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(grade)
        .bind(date_of_birth)
        .bind(disability)
        .bind(organization)
        .execute(pool)
        .await?;
    }

    let emma_iep = Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?;
    let marcus_iep = Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?;

    sqlx::query(
        r#"
        INSERT INTO accompli.ieps
        (id, student_id, plan_year, effective_date, annual_review_date,
         triennial_evaluation_date, disability, present_levels, transition_plan, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active')
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(emma_iep)
    .bind(emma)
    .bind("2025-2026")
    .bind(NaiveDate::from_ymd_opt(2025, 9, 2).context("invalid date")?)
    .bind(NaiveDate::from_ymd_opt(2026, 9, 2).context("invalid date")?)
    .bind(NaiveDate::from_ymd_opt(2027, 9, 2).context("invalid date")?)
    .bind("specific-learning-disability")
    .bind(
        "Emma is a 2nd grade student reading at a beginning 2nd grade level \
         (DRA 16, 45 wpm with 85% accuracy). Her specific learning disability in \
         reading impacts access to grade-level curriculum across academic areas. \
         She benefits from explicit phonics instruction, visual supports, and \
         frequent breaks.",
    )
    .bind(None::<serde_json::Value>)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO accompli.ieps
        (id, student_id, plan_year, effective_date, annual_review_date,
         triennial_evaluation_date, disability, present_levels, transition_plan, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active')
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(marcus_iep)
    .bind(marcus)
    .bind("2025-2026")
    .bind(NaiveDate::from_ymd_opt(2025, 9, 2).context("invalid date")?)
    .bind(NaiveDate::from_ymd_opt(2026, 9, 2).context("invalid date")?)
    .bind(NaiveDate::from_ymd_opt(2026, 11, 15).context("invalid date")?)
    .bind("autism")
    .bind(
        "Marcus is a 10th grade student on grade level in math and one year \
         below in written expression. He uses self-regulation strategies with \
         adult prompting and is working toward independent use during \
         transitions between classes.",
    )
    .bind(Some(serde_json::to_value(TransitionPlan {
        postsecondary_goals: "Community college computer courses; part-time work in IT support"
            .to_string(),
        transfer_of_rights_notice: false,
    })?))
    .execute(pool)
    .await?;

    let reading_goal = Uuid::parse_str("9a1b2c3d-4e5f-4a6b-8c7d-0e1f2a3b4c5d")?;
    let writing_goal = Uuid::parse_str("8b2c3d4e-5f6a-4b7c-9d8e-1f2a3b4c5d6e")?;
    let regulation_goal = Uuid::parse_str("7c3d4e5f-6a7b-4c8d-ae9f-2a3b4c5d6e7f")?;

    let goals = vec![
        (
            reading_goal,
            emma_iep,
            "academic-reading",
            "By September 2026, when given a 2nd-3rd grade level passage, Emma will \
             read aloud with 95% accuracy and answer 4 of 5 comprehension questions \
             correctly as measured by curriculum-based assessments.",
            45.0,
            80.0,
            MeasurementSpec::Accuracy,
            "CBM oral reading fluency probes",
            "monthly",
            58,
        ),
        (
            writing_goal,
            emma_iep,
            "academic-writing",
            "By September 2026, when given a writing prompt and graphic organizer, \
             Emma will write a 5-sentence paragraph with 80% of words spelled \
             correctly as measured by bi-weekly writing samples.",
            30.0,
            80.0,
            MeasurementSpec::RawScore,
            "Writing samples scored with district rubric",
            "bi-weekly",
            40,
        ),
        (
            regulation_goal,
            marcus_iep,
            "behavioral",
            "By September 2026, Marcus will independently use a self-regulation \
             strategy during class transitions in 5 of 5 daily opportunities as \
             measured by staff frequency counts.",
            20.0,
            80.0,
            MeasurementSpec::Frequency { target: 5.0 },
            "Staff frequency counts",
            "daily",
            60,
        ),
    ];

    for (id, iep_id, area, statement, baseline, target, measurement, method, schedule, current) in
        goals
    {
        sqlx::query(
            r#"
            INSERT INTO accompli.goals
            (id, iep_id, area, statement, baseline, target, measurement,
             evaluation_method, evaluation_schedule, current_progress, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active')
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(iep_id)
        .bind(area)
        .bind(statement)
        .bind(baseline)
        .bind(target)
        .bind(serde_json::to_value(measurement)?)
        .bind(method)
        .bind(schedule)
        .bind(current)
        .execute(pool)
        .await?;
    }

    let points = vec![
        (
            "seed-pp-001",
            reading_goal,
            NaiveDate::from_ymd_opt(2025, 9, 15).context("invalid date")?,
            serde_json::json!({"kind": "accuracy", "correct": 9, "total": 20}),
            "verbal",
            "Decoding CVC words; comprehension questions answered with rereading",
        ),
        (
            "seed-pp-002",
            reading_goal,
            NaiveDate::from_ymd_opt(2025, 10, 15).context("invalid date")?,
            serde_json::json!({"kind": "accuracy", "correct": 13, "total": 25}),
            "verbal",
            "Improved fluency on practiced passages",
        ),
        (
            "seed-pp-003",
            reading_goal,
            NaiveDate::from_ymd_opt(2025, 11, 15).context("invalid date")?,
            serde_json::json!({"kind": "accuracy", "correct": 15, "total": 26}),
            "independent",
            "First independent probe above baseline",
        ),
        (
            "seed-pp-004",
            regulation_goal,
            NaiveDate::from_ymd_opt(2025, 10, 1).context("invalid date")?,
            serde_json::json!({"kind": "frequency", "value": 2.0}),
            "gestural",
            "Used break card twice with gesture prompt",
        ),
        (
            "seed-pp-005",
            regulation_goal,
            NaiveDate::from_ymd_opt(2025, 11, 1).context("invalid date")?,
            serde_json::json!({"kind": "frequency", "value": 3.0}),
            "verbal",
            "Three strategy uses; verbal reminder at start of day",
        ),
    ];

    for (source_key, goal_id, collected_on, measurement, prompt_level, note) in points {
        sqlx::query(
            r#"
            INSERT INTO accompli.progress_points
            (id, goal_id, collected_on, measurement, prompt_level, mastery_criteria_met,
             note, source_key)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(goal_id)
        .bind(collected_on)
        .bind(measurement)
        .bind(prompt_level)
        .bind(note)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let events = vec![
        (
            "seed-be-001",
            marcus,
            Some(regulation_goal),
            "2025-11-03T10:42:00Z",
            "Bell rang for passing period; hallway crowded",
            "Stopped in doorway, covered ears, refused to move",
            "Staff offered quiet route; Marcus took it after two minutes",
            "medium",
            180i64,
            "Hallway B",
            vec!["crowded hallway", "noise"],
            vec!["offered quiet route", "wait time"],
            Some(4i16),
        ),
        (
            "seed-be-002",
            emma,
            None,
            "2025-11-05T13:10:00Z",
            "Independent writing task assigned",
            "Put head down and pushed paper away",
            "Teacher chunked the task; Emma restarted with first sentence",
            "low",
            120i64,
            "Classroom 12",
            vec!["afternoon", "difficult task"],
            vec!["task chunking"],
            Some(5i16),
        ),
    ];

    for (
        source_key,
        student_id,
        goal_id,
        occurred_at,
        antecedent,
        behavior_text,
        consequence,
        severity,
        duration_seconds,
        location,
        factors,
        interventions,
        rating,
    ) in events
    {
        sqlx::query(
            r#"
            INSERT INTO accompli.behavior_events
            (id, student_id, goal_id, occurred_at, antecedent, behavior, consequence,
             severity, duration_seconds, location, environmental_factors, interventions,
             effectiveness_rating, follow_up_needed, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, FALSE, $14)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(goal_id)
        .bind(occurred_at.parse::<chrono::DateTime<chrono::Utc>>()?)
        .bind(antecedent)
        .bind(behavior_text)
        .bind(consequence)
        .bind(severity)
        .bind(duration_seconds)
        .bind(location)
        .bind(serde_json::to_value(factors)?)
        .bind(serde_json::to_value(interventions)?)
        .bind(rating)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}
