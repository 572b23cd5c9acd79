use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod assist;
mod behavior;
mod compliance;
mod db;
mod error;
mod models;
mod progress;
mod report;
mod seed;

use models::{BehaviorEvent, GoalOutcome, GoalState, Measurement, ProgressPoint, PromptLevel, Severity};

#[derive(Parser)]
#[command(name = "accompli-iep-tracker")]
#[command(about = "IEP goal, behavior, and compliance tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic demo data
    Seed,
    /// Import behavior events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a progress data point against a goal
    Record {
        #[arg(long)]
        goal: Uuid,
        #[arg(long)]
        date: NaiveDate,
        /// accuracy | frequency | duration | latency | raw-score
        #[arg(long)]
        kind: String,
        #[arg(long)]
        value: Option<f64>,
        #[arg(long)]
        correct: Option<u32>,
        #[arg(long)]
        total: Option<u32>,
        #[arg(long, default_value = "independent")]
        prompt: String,
        #[arg(long)]
        mastered: bool,
        #[arg(long, default_value = "")]
        note: String,
        /// Version the goal was read at; a stale value rejects the write.
        /// Defaults to the goal's current version.
        #[arg(long)]
        expected_version: Option<i64>,
    },
    /// Log an ABC behavior event
    Log {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        goal: Option<Uuid>,
        #[arg(long)]
        antecedent: String,
        #[arg(long)]
        behavior: String,
        #[arg(long)]
        consequence: String,
        /// low | medium | high
        #[arg(long)]
        severity: String,
        #[arg(long, default_value_t = 0)]
        duration_seconds: i64,
        #[arg(long, default_value = "")]
        location: String,
        /// Semicolon-separated list
        #[arg(long)]
        interventions: Option<String>,
        /// Semicolon-separated list
        #[arg(long)]
        factors: Option<String>,
        #[arg(long)]
        rating: Option<i16>,
        #[arg(long)]
        follow_up: bool,
        /// Defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Close a goal as mastered or discontinued
    Close {
        #[arg(long)]
        goal: Uuid,
        #[arg(long)]
        outcome: String,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Append a follow-up note to a behavior event
    FollowUp {
        #[arg(long)]
        event: Uuid,
        note: String,
    },
    /// Create a draft IEP from a JSON document
    CreateIep {
        #[arg(long)]
        json: PathBuf,
    },
    /// Activate a draft IEP, superseding the student's current plan
    ActivateIep {
        #[arg(long)]
        iep: Uuid,
    },
    /// Record an amendment against the current IEP
    Amend {
        #[arg(long)]
        iep: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        changes: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        authorized_by: String,
    },
    /// Derive progress status for a student's goals
    Status {
        #[arg(long)]
        student: Uuid,
    },
    /// Summarize behavior events for a student
    Summarize {
        #[arg(long)]
        student: Uuid,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
    },
    /// Check date-driven IEP obligations
    Compliance {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Generate a markdown progress report
    Report {
        #[arg(long)]
        student: Uuid,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Ask the assistant a question grounded in a student's IEP
    Assist {
        #[arg(long)]
        student: Uuid,
        question: String,
    },
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_measurement(
    kind: &str,
    value: Option<f64>,
    correct: Option<u32>,
    total: Option<u32>,
) -> anyhow::Result<Measurement> {
    match kind {
        "accuracy" => Ok(Measurement::Accuracy {
            correct: correct.context("--correct is required for accuracy data")?,
            total: total.context("--total is required for accuracy data")?,
        }),
        "frequency" => Ok(Measurement::Frequency {
            value: value.context("--value is required for frequency data")?,
        }),
        "duration" => Ok(Measurement::Duration {
            seconds: value.context("--value is required for duration data")?,
        }),
        "latency" => Ok(Measurement::Latency {
            seconds: value.context("--value is required for latency data")?,
        }),
        "raw-score" => Ok(Measurement::RawScore {
            value: value.context("--value is required for raw-score data")?,
        }),
        other => anyhow::bail!("unknown measurement kind {other:?}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            seed::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_events_csv(&pool, &csv).await?;
            println!("Inserted {inserted} behavior events from {}.", csv.display());
        }
        Commands::Record {
            goal,
            date,
            kind,
            value,
            correct,
            total,
            prompt,
            mastered,
            note,
            expected_version,
        } => {
            let measurement = parse_measurement(&kind, value, correct, total)?;
            let prompt_level = PromptLevel::parse(&prompt)
                .with_context(|| format!("unknown prompt level {prompt:?}"))?;
            let point = ProgressPoint {
                id: Uuid::new_v4(),
                goal_id: goal,
                collected_on: date,
                measurement,
                prompt_level,
                mastery_criteria_met: mastered,
                note,
            };
            let expected = match expected_version {
                Some(version) => version,
                None => db::fetch_goal(&pool, goal).await?.version,
            };
            let current = db::record_progress(&pool, &point, expected).await?;
            println!("Recorded. Goal {goal} is now at {current}%.");
        }
        Commands::Log {
            student,
            goal,
            antecedent,
            behavior,
            consequence,
            severity,
            duration_seconds,
            location,
            interventions,
            factors,
            rating,
            follow_up,
            at,
        } => {
            let severity = Severity::parse(&severity)
                .with_context(|| format!("unknown severity {severity:?}"))?;
            let event = BehaviorEvent {
                id: Uuid::new_v4(),
                student_id: student,
                goal_id: goal,
                occurred_at: at.unwrap_or_else(Utc::now),
                antecedent,
                behavior,
                consequence,
                severity,
                duration_seconds,
                location,
                environmental_factors: split_list(factors.as_deref()),
                interventions: split_list(interventions.as_deref()),
                effectiveness_rating: rating,
                follow_up_needed: follow_up,
                follow_up_notes: None,
            };
            db::record_event(&pool, &event).await?;
            println!("Behavior event {} recorded.", event.id);
        }
        Commands::Close {
            goal,
            outcome,
            date,
        } => {
            let outcome = GoalOutcome::parse(&outcome)
                .with_context(|| format!("unknown outcome {outcome:?}"))?;
            db::close_goal(&pool, goal, outcome, date).await?;
            println!("Goal {goal} closed as {}.", outcome.as_str());
        }
        Commands::FollowUp { event, note } => {
            db::append_follow_up(&pool, event, &note).await?;
            println!("Follow-up note recorded for event {event}.");
        }
        Commands::CreateIep { json } => {
            let document = std::fs::read_to_string(&json)
                .with_context(|| format!("failed to read {}", json.display()))?;
            let iep: models::Iep = serde_json::from_str(&document)
                .with_context(|| format!("{} is not a valid IEP document", json.display()))?;
            db::create_iep(&pool, &iep).await?;
            println!("Draft IEP {} created for student {}.", iep.id, iep.student_id);
        }
        Commands::ActivateIep { iep } => {
            db::activate_iep(&pool, iep).await?;
            println!("IEP {iep} is now active.");
        }
        Commands::Amend {
            iep,
            date,
            changes,
            reason,
            authorized_by,
        } => {
            let amendment = models::Amendment {
                amended_on: date,
                changes,
                reason,
                authorized_by,
            };
            db::amend_iep(&pool, iep, &amendment).await?;
            println!("Amendment recorded for IEP {iep}.");
        }
        Commands::Status { student } => {
            let record = db::fetch_student(&pool, student).await?;
            let goals = db::fetch_goals_with_points(&pool, student).await?;

            if goals.is_empty() {
                println!("No goals on the current IEP for {}.", record.full_name());
                return Ok(());
            }

            println!("Goal status for {}:", record.full_name());
            for (goal, points) in &goals {
                match goal.state {
                    GoalState::Active => println!(
                        "- {} at {}% ({} points): {}",
                        goal.area,
                        goal.current_progress,
                        points.len(),
                        progress::derive_status(goal, points)
                    ),
                    GoalState::Closed { outcome, closed_on } => println!(
                        "- {} at {}%: {} on {}",
                        goal.area,
                        goal.current_progress,
                        outcome.as_str(),
                        closed_on
                    ),
                }
            }
        }
        Commands::Summarize {
            student,
            since_days,
        } => {
            let record = db::fetch_student(&pool, student).await?;
            let cutoff = behavior::cutoff_date(since_days);
            let events = db::fetch_events(&pool, student, Some(cutoff)).await?;

            if events.is_empty() {
                println!(
                    "No behavior events for {} since {cutoff}.",
                    record.full_name()
                );
                return Ok(());
            }

            let summary = behavior::summarize(&events);
            println!(
                "{} events for {} since {cutoff} ({} low, {} medium, {} high)",
                summary.total_events,
                record.full_name(),
                summary.low,
                summary.medium,
                summary.high
            );
            if let Some(avg) = summary.avg_effectiveness {
                println!("Average intervention effectiveness {avg:.1}/5");
            }
            for (antecedent, count) in &summary.top_antecedents {
                println!("- antecedent: {antecedent} ({count}x)");
            }
            for (intervention, count) in &summary.top_interventions {
                println!("- intervention: {intervention} ({count}x)");
            }
        }
        Commands::Compliance { student, as_of } => {
            let record = db::fetch_student(&pool, student).await?;
            let iep = db::fetch_current_iep(&pool, student).await?;
            let today = as_of.unwrap_or_else(|| Utc::now().date_naive());

            println!("Compliance for {} as of {today}:", record.full_name());
            for alert in compliance::check_compliance(&iep, &record, today) {
                println!(
                    "- {}: {} ({})",
                    alert.obligation.as_str(),
                    alert.due_date,
                    alert.status.as_str()
                );
            }
        }
        Commands::Report {
            student,
            since_days,
            out,
        } => {
            let record = db::fetch_student(&pool, student).await?;
            let iep = db::fetch_current_iep(&pool, student).await?;
            let goals = db::fetch_goals_with_points(&pool, student).await?;
            let cutoff = behavior::cutoff_date(since_days);
            let events = db::fetch_events(&pool, student, Some(cutoff)).await?;
            let today = Utc::now().date_naive();

            let report = report::build_report(&record, &iep, &goals, &events, today, cutoff);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Assist { student, question } => {
            let record = db::fetch_student(&pool, student).await?;
            let iep = db::fetch_current_iep(&pool, student).await?;
            let goals = db::fetch_goals_with_points(&pool, student).await?;
            let cutoff = behavior::cutoff_date(60);
            let events = db::fetch_events(&pool, student, Some(cutoff)).await?;

            let context = assist::build_context(&record, &iep, &goals, &events);
            let reply = assist::ask(&question, &context).await;
            println!("{reply}");
        }
    }

    Ok(())
}
