use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::behavior;
use crate::error::DomainError;
use crate::models::{
    Amendment, BehaviorEvent, DisabilityCategory, Goal, GoalArea, GoalOutcome, GoalState, Iep,
    IepStatus, MeasurementSpec, ProgressPoint, PromptLevel, Severity, Student, TransitionPlan,
};
use crate::progress;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn student_from_row(row: &PgRow) -> anyhow::Result<Student> {
    let disability: String = row.get("disability");
    Ok(Student {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        grade_level: row.get("grade_level"),
        date_of_birth: row.get("date_of_birth"),
        disability: DisabilityCategory::parse(&disability)
            .with_context(|| format!("unknown disability category {disability:?}"))?,
        organization: row.get("organization"),
    })
}

fn goal_from_row(row: &PgRow) -> anyhow::Result<Goal> {
    let area: String = row.get("area");
    let status: String = row.get("status");
    let state = match status.as_str() {
        "active" => GoalState::Active,
        other => {
            let outcome = GoalOutcome::parse(other)
                .with_context(|| format!("unknown goal status {other:?}"))?;
            let closed_on: Option<NaiveDate> = row.get("closed_on");
            GoalState::Closed {
                outcome,
                closed_on: closed_on.context("closed goal is missing closed_on")?,
            }
        }
    };
    let measurement: MeasurementSpec =
        serde_json::from_value(row.get::<serde_json::Value, _>("measurement"))
            .context("goal measurement column does not parse")?;

    Ok(Goal {
        id: row.get("id"),
        iep_id: row.get("iep_id"),
        area: GoalArea::parse(&area).with_context(|| format!("unknown goal area {area:?}"))?,
        statement: row.get("statement"),
        baseline: row.get("baseline"),
        target: row.get("target"),
        measurement,
        evaluation_method: row.get("evaluation_method"),
        evaluation_schedule: row.get("evaluation_schedule"),
        current_progress: row.get("current_progress"),
        state,
        version: row.get("version"),
    })
}

fn point_from_row(row: &PgRow) -> anyhow::Result<ProgressPoint> {
    let prompt_level: String = row.get("prompt_level");
    Ok(ProgressPoint {
        id: row.get("id"),
        goal_id: row.get("goal_id"),
        collected_on: row.get("collected_on"),
        measurement: serde_json::from_value(row.get::<serde_json::Value, _>("measurement"))
            .context("progress point measurement column does not parse")?,
        prompt_level: PromptLevel::parse(&prompt_level)
            .with_context(|| format!("unknown prompt level {prompt_level:?}"))?,
        mastery_criteria_met: row.get("mastery_criteria_met"),
        note: row.get("note"),
    })
}

fn event_from_row(row: &PgRow) -> anyhow::Result<BehaviorEvent> {
    let severity: String = row.get("severity");
    Ok(BehaviorEvent {
        id: row.get("id"),
        student_id: row.get("student_id"),
        goal_id: row.get("goal_id"),
        occurred_at: row.get("occurred_at"),
        antecedent: row.get("antecedent"),
        behavior: row.get("behavior"),
        consequence: row.get("consequence"),
        severity: Severity::parse(&severity)
            .with_context(|| format!("unknown severity {severity:?}"))?,
        duration_seconds: row.get("duration_seconds"),
        location: row.get("location"),
        environmental_factors: serde_json::from_value(
            row.get::<serde_json::Value, _>("environmental_factors"),
        )
        .context("environmental_factors column does not parse")?,
        interventions: serde_json::from_value(row.get::<serde_json::Value, _>("interventions"))
            .context("interventions column does not parse")?,
        effectiveness_rating: row.get("effectiveness_rating"),
        follow_up_needed: row.get("follow_up_needed"),
        follow_up_notes: row.get("follow_up_notes"),
    })
}

pub async fn fetch_student(pool: &PgPool, id: Uuid) -> anyhow::Result<Student> {
    let row = sqlx::query("SELECT * FROM accompli.students WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("student {id}")))?;
    student_from_row(&row)
}

pub async fn fetch_current_iep(pool: &PgPool, student_id: Uuid) -> anyhow::Result<Iep> {
    let row = sqlx::query(
        "SELECT * FROM accompli.ieps \
         WHERE student_id = $1 AND status IN ('active', 'amended')",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DomainError::NotFound(format!("current IEP for student {student_id}")))?;

    let status: String = row.get("status");
    let disability: String = row.get("disability");
    let transition_plan: Option<TransitionPlan> = row
        .get::<Option<serde_json::Value>, _>("transition_plan")
        .map(serde_json::from_value)
        .transpose()
        .context("transition_plan column does not parse")?;
    let iep_id: Uuid = row.get("id");

    let amendment_rows = sqlx::query(
        "SELECT amended_on, changes, reason, authorized_by \
         FROM accompli.iep_amendments WHERE iep_id = $1 \
         ORDER BY amended_on, created_at",
    )
    .bind(iep_id)
    .fetch_all(pool)
    .await?;

    let amendments = amendment_rows
        .iter()
        .map(|row| Amendment {
            amended_on: row.get("amended_on"),
            changes: row.get("changes"),
            reason: row.get("reason"),
            authorized_by: row.get("authorized_by"),
        })
        .collect();

    Ok(Iep {
        id: iep_id,
        student_id: row.get("student_id"),
        plan_year: row.get("plan_year"),
        effective_date: row.get("effective_date"),
        annual_review_date: row.get("annual_review_date"),
        triennial_evaluation_date: row.get("triennial_evaluation_date"),
        disability: DisabilityCategory::parse(&disability)
            .with_context(|| format!("unknown disability category {disability:?}"))?,
        present_levels: row.get("present_levels"),
        transition_plan,
        status: IepStatus::parse(&status)
            .with_context(|| format!("unknown IEP status {status:?}"))?,
        amendments,
    })
}

pub async fn fetch_goal(pool: &PgPool, id: Uuid) -> anyhow::Result<Goal> {
    let row = sqlx::query("SELECT * FROM accompli.goals WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("goal {id}")))?;
    goal_from_row(&row)
}

pub async fn fetch_points(pool: &PgPool, goal_id: Uuid) -> anyhow::Result<Vec<ProgressPoint>> {
    let rows = sqlx::query(
        "SELECT * FROM accompli.progress_points WHERE goal_id = $1 \
         ORDER BY collected_on, created_at",
    )
    .bind(goal_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(point_from_row).collect()
}

pub async fn fetch_goals_with_points(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Vec<(Goal, Vec<ProgressPoint>)>> {
    let rows = sqlx::query(
        "SELECT g.* FROM accompli.goals g \
         JOIN accompli.ieps i ON i.id = g.iep_id \
         WHERE i.student_id = $1 AND i.status IN ('active', 'amended') \
         ORDER BY g.area, g.statement",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut goals = Vec::new();
    for row in rows {
        let goal = goal_from_row(&row)?;
        let points = fetch_points(pool, goal.id).await?;
        goals.push((goal, points));
    }
    Ok(goals)
}

// Appends the point, refreshes the cached progress from the newest point,
// and bumps the goal version. A stale expected_version loses the race and
// nothing is written.
pub async fn record_progress(
    pool: &PgPool,
    point: &ProgressPoint,
    expected_version: i64,
) -> anyhow::Result<i32> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT * FROM accompli.goals WHERE id = $1 FOR UPDATE")
        .bind(point.goal_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("goal {}", point.goal_id)))?;
    let goal = goal_from_row(&row)?;

    progress::validate_point(&goal, &point.measurement)?;
    if goal.version != expected_version {
        return Err(DomainError::ConcurrentModification {
            goal_id: goal.id,
            expected: expected_version,
        }
        .into());
    }

    sqlx::query(
        r#"
        INSERT INTO accompli.progress_points
        (id, goal_id, collected_on, measurement, prompt_level, mastery_criteria_met, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(point.id)
    .bind(point.goal_id)
    .bind(point.collected_on)
    .bind(serde_json::to_value(&point.measurement)?)
    .bind(point.prompt_level.as_str())
    .bind(point.mastery_criteria_met)
    .bind(&point.note)
    .execute(&mut *tx)
    .await?;

    let point_rows = sqlx::query(
        "SELECT * FROM accompli.progress_points WHERE goal_id = $1 \
         ORDER BY collected_on, created_at",
    )
    .bind(point.goal_id)
    .fetch_all(&mut *tx)
    .await?;
    let points: Vec<ProgressPoint> = point_rows
        .iter()
        .map(point_from_row)
        .collect::<anyhow::Result<_>>()?;
    let current = progress::recompute_progress(&goal, &points).unwrap_or(goal.current_progress);

    let updated = sqlx::query(
        "UPDATE accompli.goals SET current_progress = $1, version = version + 1 \
         WHERE id = $2 AND version = $3",
    )
    .bind(current)
    .bind(goal.id)
    .bind(expected_version)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(DomainError::ConcurrentModification {
            goal_id: goal.id,
            expected: expected_version,
        }
        .into());
    }

    tx.commit().await?;
    Ok(current)
}

// Terminal transition; rejection leaves the goal untouched.
pub async fn close_goal(
    pool: &PgPool,
    goal_id: Uuid,
    outcome: GoalOutcome,
    closed_on: NaiveDate,
) -> anyhow::Result<()> {
    let result = sqlx::query(
        "UPDATE accompli.goals SET status = $1, closed_on = $2, version = version + 1 \
         WHERE id = $3 AND status = 'active'",
    )
    .bind(outcome.as_str())
    .bind(closed_on)
    .bind(goal_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query("SELECT id FROM accompli.goals WHERE id = $1")
            .bind(goal_id)
            .fetch_optional(pool)
            .await?;
        return match exists {
            None => Err(DomainError::NotFound(format!("goal {goal_id}")).into()),
            Some(_) => Err(DomainError::GoalClosed(goal_id).into()),
        };
    }
    Ok(())
}

pub async fn record_event(pool: &PgPool, event: &BehaviorEvent) -> anyhow::Result<()> {
    behavior::validate_event(event)?;

    sqlx::query(
        r#"
        INSERT INTO accompli.behavior_events
        (id, student_id, goal_id, occurred_at, antecedent, behavior, consequence,
         severity, duration_seconds, location, environmental_factors, interventions,
         effectiveness_rating, follow_up_needed, follow_up_notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(event.id)
    .bind(event.student_id)
    .bind(event.goal_id)
    .bind(event.occurred_at)
    .bind(&event.antecedent)
    .bind(&event.behavior)
    .bind(&event.consequence)
    .bind(event.severity.as_str())
    .bind(event.duration_seconds)
    .bind(&event.location)
    .bind(serde_json::to_value(&event.environmental_factors)?)
    .bind(serde_json::to_value(&event.interventions)?)
    .bind(event.effectiveness_rating)
    .bind(event.follow_up_needed)
    .bind(&event.follow_up_notes)
    .execute(pool)
    .await?;
    Ok(())
}

// Events stay immutable; only follow-up notes may be appended afterwards.
pub async fn append_follow_up(
    pool: &PgPool,
    event_id: Uuid,
    note: &str,
) -> anyhow::Result<()> {
    let result = sqlx::query(
        "UPDATE accompli.behavior_events \
         SET follow_up_notes = COALESCE(follow_up_notes || chr(10), '') || $1, \
             follow_up_needed = FALSE \
         WHERE id = $2",
    )
    .bind(note)
    .bind(event_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DomainError::NotFound(format!("behavior event {event_id}")).into());
    }
    Ok(())
}

pub async fn fetch_events(
    pool: &PgPool,
    student_id: Uuid,
    since: Option<NaiveDate>,
) -> anyhow::Result<Vec<BehaviorEvent>> {
    let mut query = String::from(
        "SELECT * FROM accompli.behavior_events WHERE student_id = $1",
    );
    if since.is_some() {
        query.push_str(" AND occurred_at >= $2");
    }
    query.push_str(" ORDER BY occurred_at");

    let mut rows = sqlx::query(&query).bind(student_id);
    if let Some(date) = since {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .context("invalid cutoff date")?
            .and_utc();
        rows = rows.bind(midnight);
    }

    let records = rows.fetch_all(pool).await?;
    records.iter().map(event_from_row).collect()
}

pub async fn create_iep(pool: &PgPool, iep: &Iep) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO accompli.ieps
        (id, student_id, plan_year, effective_date, annual_review_date,
         triennial_evaluation_date, disability, present_levels, transition_plan, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'draft')
        "#,
    )
    .bind(iep.id)
    .bind(iep.student_id)
    .bind(&iep.plan_year)
    .bind(iep.effective_date)
    .bind(iep.annual_review_date)
    .bind(iep.triennial_evaluation_date)
    .bind(iep.disability.as_str())
    .bind(&iep.present_levels)
    .bind(
        iep.transition_plan
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?,
    )
    .execute(pool)
    .await?;
    Ok(())
}

// The previous plan is superseded, never deleted; the partial unique index
// backs this up at the storage layer.
pub async fn activate_iep(pool: &PgPool, iep_id: Uuid) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT student_id FROM accompli.ieps WHERE id = $1")
        .bind(iep_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("IEP {iep_id}")))?;
    let student_id: Uuid = row.get("student_id");

    sqlx::query(
        "UPDATE accompli.ieps SET status = 'expired' \
         WHERE student_id = $1 AND status IN ('active', 'amended')",
    )
    .bind(student_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE accompli.ieps SET status = 'active' WHERE id = $1")
        .bind(iep_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

// Changes are recorded as audit-trail entries; the plan text itself is
// never rewritten in place.
pub async fn amend_iep(pool: &PgPool, iep_id: Uuid, amendment: &Amendment) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT status FROM accompli.ieps WHERE id = $1")
        .bind(iep_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("IEP {iep_id}")))?;
    let status: String = row.get("status");
    let status = IepStatus::parse(&status)
        .with_context(|| format!("unknown IEP status {status:?}"))?;
    if !status.is_current() {
        anyhow::bail!("IEP {iep_id} is {} and cannot be amended", status.as_str());
    }

    sqlx::query(
        r#"
        INSERT INTO accompli.iep_amendments (id, iep_id, amended_on, changes, reason, authorized_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(iep_id)
    .bind(amendment.amended_on)
    .bind(&amendment.changes)
    .bind(&amendment.reason)
    .bind(&amendment.authorized_by)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE accompli.ieps SET status = 'amended' WHERE id = $1")
        .bind(iep_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn import_events_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_id: Uuid,
        occurred_at: DateTime<Utc>,
        antecedent: String,
        behavior: String,
        consequence: String,
        severity: String,
        duration_seconds: i64,
        location: Option<String>,
        interventions: Option<String>,
        effectiveness_rating: Option<i16>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let severity = Severity::parse(&row.severity).ok_or_else(|| {
            DomainError::InvalidEvent(format!("unknown severity {:?}", row.severity))
        })?;
        let interventions: Vec<String> = row
            .interventions
            .as_deref()
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();

        let event = BehaviorEvent {
            id: Uuid::new_v4(),
            student_id: row.student_id,
            goal_id: None,
            occurred_at: row.occurred_at,
            antecedent: row.antecedent,
            behavior: row.behavior,
            consequence: row.consequence,
            severity,
            duration_seconds: row.duration_seconds,
            location: row.location.unwrap_or_default(),
            environmental_factors: Vec::new(),
            interventions,
            effectiveness_rating: row.effectiveness_rating,
            follow_up_needed: false,
            follow_up_notes: None,
        };
        behavior::validate_event(&event)?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO accompli.behavior_events
            (id, student_id, goal_id, occurred_at, antecedent, behavior, consequence,
             severity, duration_seconds, location, environmental_factors, interventions,
             effectiveness_rating, follow_up_needed, follow_up_notes, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(event.id)
        .bind(event.student_id)
        .bind(event.goal_id)
        .bind(event.occurred_at)
        .bind(&event.antecedent)
        .bind(&event.behavior)
        .bind(&event.consequence)
        .bind(event.severity.as_str())
        .bind(event.duration_seconds)
        .bind(&event.location)
        .bind(serde_json::to_value(&event.environmental_factors)?)
        .bind(serde_json::to_value(&event.interventions)?)
        .bind(event.effectiveness_rating)
        .bind(event.follow_up_needed)
        .bind(&event.follow_up_notes)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
