use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// The 13 IDEA disability categories (34 CFR 300.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisabilityCategory {
    Autism,
    DeafBlindness,
    Deafness,
    EmotionalDisturbance,
    HearingImpairment,
    IntellectualDisability,
    MultipleDisabilities,
    OrthopedicImpairment,
    OtherHealthImpairment,
    SpecificLearningDisability,
    SpeechLanguageImpairment,
    TraumaticBrainInjury,
    VisualImpairment,
}

impl DisabilityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Autism => "autism",
            Self::DeafBlindness => "deaf-blindness",
            Self::Deafness => "deafness",
            Self::EmotionalDisturbance => "emotional-disturbance",
            Self::HearingImpairment => "hearing-impairment",
            Self::IntellectualDisability => "intellectual-disability",
            Self::MultipleDisabilities => "multiple-disabilities",
            Self::OrthopedicImpairment => "orthopedic-impairment",
            Self::OtherHealthImpairment => "other-health-impairment",
            Self::SpecificLearningDisability => "specific-learning-disability",
            Self::SpeechLanguageImpairment => "speech-language-impairment",
            Self::TraumaticBrainInjury => "traumatic-brain-injury",
            Self::VisualImpairment => "visual-impairment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "autism" => Some(Self::Autism),
            "deaf-blindness" => Some(Self::DeafBlindness),
            "deafness" => Some(Self::Deafness),
            "emotional-disturbance" => Some(Self::EmotionalDisturbance),
            "hearing-impairment" => Some(Self::HearingImpairment),
            "intellectual-disability" => Some(Self::IntellectualDisability),
            "multiple-disabilities" => Some(Self::MultipleDisabilities),
            "orthopedic-impairment" => Some(Self::OrthopedicImpairment),
            "other-health-impairment" => Some(Self::OtherHealthImpairment),
            "specific-learning-disability" => Some(Self::SpecificLearningDisability),
            "speech-language-impairment" => Some(Self::SpeechLanguageImpairment),
            "traumatic-brain-injury" => Some(Self::TraumaticBrainInjury),
            "visual-impairment" => Some(Self::VisualImpairment),
            _ => None,
        }
    }
}

impl std::fmt::Display for DisabilityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalArea {
    AcademicReading,
    AcademicWriting,
    AcademicMath,
    Communication,
    SocialEmotional,
    Behavioral,
    MotorSkills,
    DailyLiving,
    Vocational,
    Transition,
}

impl GoalArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcademicReading => "academic-reading",
            Self::AcademicWriting => "academic-writing",
            Self::AcademicMath => "academic-math",
            Self::Communication => "communication",
            Self::SocialEmotional => "social-emotional",
            Self::Behavioral => "behavioral",
            Self::MotorSkills => "motor-skills",
            Self::DailyLiving => "daily-living",
            Self::Vocational => "vocational",
            Self::Transition => "transition",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "academic-reading" => Some(Self::AcademicReading),
            "academic-writing" => Some(Self::AcademicWriting),
            "academic-math" => Some(Self::AcademicMath),
            "communication" => Some(Self::Communication),
            "social-emotional" => Some(Self::SocialEmotional),
            "behavioral" => Some(Self::Behavioral),
            "motor-skills" => Some(Self::MotorSkills),
            "daily-living" => Some(Self::DailyLiving),
            "vocational" => Some(Self::Vocational),
            "transition" => Some(Self::Transition),
            _ => None,
        }
    }
}

impl std::fmt::Display for GoalArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IepStatus {
    Draft,
    Active,
    Expired,
    Amended,
}

impl IepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Amended => "amended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "amended" => Some(Self::Amended),
            _ => None,
        }
    }

    // An amended plan is still the plan in effect for the student.
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Active | Self::Amended)
    }
}

impl Default for IepStatus {
    fn default() -> Self {
        Self::Draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptLevel {
    Independent,
    Verbal,
    Gestural,
    Model,
    Physical,
}

impl PromptLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Independent => "independent",
            Self::Verbal => "verbal",
            Self::Gestural => "gestural",
            Self::Model => "model",
            Self::Physical => "physical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "independent" => Some(Self::Independent),
            "verbal" => Some(Self::Verbal),
            "gestural" => Some(Self::Gestural),
            "model" => Some(Self::Model),
            "physical" => Some(Self::Physical),
            _ => None,
        }
    }
}

// How a goal is measured, with the declared raw target for rate-like kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MeasurementSpec {
    Accuracy,
    Frequency { target: f64 },
    Duration { target_seconds: f64 },
    Latency { target_seconds: f64 },
    RawScore,
}

impl MeasurementSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Frequency { .. } => "frequency",
            Self::Duration { .. } => "duration",
            Self::Latency { .. } => "latency",
            Self::RawScore => "raw-score",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Measurement {
    Accuracy { correct: u32, total: u32 },
    Frequency { value: f64 },
    Duration { seconds: f64 },
    Latency { seconds: f64 },
    RawScore { value: f64 },
}

impl Measurement {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Accuracy { .. } => "accuracy",
            Self::Frequency { .. } => "frequency",
            Self::Duration { .. } => "duration",
            Self::Latency { .. } => "latency",
            Self::RawScore { .. } => "raw-score",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalOutcome {
    Mastered,
    Discontinued,
}

impl GoalOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mastered => "mastered",
            Self::Discontinued => "discontinued",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mastered" => Some(Self::Mastered),
            "discontinued" => Some(Self::Discontinued),
            _ => None,
        }
    }
}

// Closed is terminal; no further progress may be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum GoalState {
    Active,
    Closed {
        outcome: GoalOutcome,
        closed_on: NaiveDate,
    },
}

impl GoalState {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    OnTrack,
    NeedsAttention,
    AtRisk,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on-track",
            Self::NeedsAttention => "needs-attention",
            Self::AtRisk => "at-risk",
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub grade_level: String,
    pub date_of_birth: NaiveDate,
    pub disability: DisabilityCategory,
    pub organization: String,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, date: NaiveDate) -> i32 {
        date.years_since(self.date_of_birth).unwrap_or(0) as i32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionPlan {
    pub postsecondary_goals: String,
    pub transfer_of_rights_notice: bool,
}

// Audit trail entry; history is appended to, never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amendment {
    pub amended_on: NaiveDate,
    pub changes: String,
    pub reason: String,
    pub authorized_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iep {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub student_id: Uuid,
    pub plan_year: String,
    pub effective_date: NaiveDate,
    pub annual_review_date: NaiveDate,
    pub triennial_evaluation_date: NaiveDate,
    pub disability: DisabilityCategory,
    #[serde(default)]
    pub present_levels: String,
    #[serde(default)]
    pub transition_plan: Option<TransitionPlan>,
    #[serde(default)]
    pub status: IepStatus,
    #[serde(default)]
    pub amendments: Vec<Amendment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub iep_id: Uuid,
    pub area: GoalArea,
    pub statement: String,
    pub baseline: f64,
    pub target: f64,
    pub measurement: MeasurementSpec,
    pub evaluation_method: String,
    pub evaluation_schedule: String,
    pub current_progress: i32,
    pub state: GoalState,
    pub version: i64,
}

// Immutable once recorded; corrections are appended as new points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub collected_on: NaiveDate,
    pub measurement: Measurement,
    pub prompt_level: PromptLevel,
    pub mastery_criteria_met: bool,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub id: Uuid,
    pub student_id: Uuid,
    pub goal_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    pub antecedent: String,
    pub behavior: String,
    pub consequence: String,
    pub severity: Severity,
    pub duration_seconds: i64,
    pub location: String,
    pub environmental_factors: Vec<String>,
    pub interventions: Vec<String>,
    pub effectiveness_rating: Option<i16>,
    pub follow_up_needed: bool,
    pub follow_up_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DomainSummary {
    pub area: GoalArea,
    pub goal_count: usize,
    pub avg_progress: f64,
    pub on_track: usize,
    pub needs_attention: usize,
    pub at_risk: usize,
}

#[derive(Debug, Clone)]
pub struct BehaviorSummary {
    pub total_events: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub top_antecedents: Vec<(String, usize)>,
    pub top_interventions: Vec<(String, usize)>,
    pub avg_effectiveness: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WeeklyTrend {
    pub week_start: NaiveDate,
    pub event_count: usize,
    pub high_severity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Obligation {
    AnnualReview,
    TriennialEvaluation,
    TransferOfRightsNotice,
}

impl Obligation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnnualReview => "annual review",
            Self::TriennialEvaluation => "triennial evaluation",
            Self::TransferOfRightsNotice => "transfer-of-rights notice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    Upcoming,
    Due,
    Overdue,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Due => "due",
            Self::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplianceAlert {
    pub obligation: Obligation,
    pub due_date: NaiveDate,
    pub status: ComplianceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn disability_categories_round_trip_their_wire_names() {
        let categories = [
            DisabilityCategory::Autism,
            DisabilityCategory::DeafBlindness,
            DisabilityCategory::Deafness,
            DisabilityCategory::EmotionalDisturbance,
            DisabilityCategory::HearingImpairment,
            DisabilityCategory::IntellectualDisability,
            DisabilityCategory::MultipleDisabilities,
            DisabilityCategory::OrthopedicImpairment,
            DisabilityCategory::OtherHealthImpairment,
            DisabilityCategory::SpecificLearningDisability,
            DisabilityCategory::SpeechLanguageImpairment,
            DisabilityCategory::TraumaticBrainInjury,
            DisabilityCategory::VisualImpairment,
        ];
        assert_eq!(categories.len(), 13);
        for category in categories {
            assert_eq!(DisabilityCategory::parse(category.as_str()), Some(category));
        }
    }

    #[test]
    fn measurement_serializes_with_tagged_kind() {
        let measurement = Measurement::Accuracy {
            correct: 4,
            total: 5,
        };
        let json = serde_json::to_value(&measurement).unwrap();
        assert_eq!(json["kind"], "accuracy");
        assert_eq!(json["correct"], 4);
        assert_eq!(json["total"], 5);
    }

    #[test]
    fn goal_with_points_round_trips_in_order() {
        let goal_id = Uuid::new_v4();
        let points: Vec<ProgressPoint> = (0..5)
            .map(|i| ProgressPoint {
                id: Uuid::new_v4(),
                goal_id,
                collected_on: NaiveDate::from_ymd_opt(2026, 1, 1 + i).unwrap(),
                measurement: Measurement::RawScore {
                    value: 40.0 + i as f64,
                },
                prompt_level: PromptLevel::Independent,
                mastery_criteria_met: false,
                note: format!("probe {i}"),
            })
            .collect();

        let encoded = serde_json::to_string(&points).unwrap();
        let decoded: Vec<ProgressPoint> = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.len(), points.len());
        for (before, after) in points.iter().zip(decoded.iter()) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.collected_on, after.collected_on);
            assert_eq!(before.measurement, after.measurement);
        }
    }

    #[test]
    fn age_counts_whole_years_only() {
        let student = Student {
            id: Uuid::new_v4(),
            first_name: "Marcus".to_string(),
            last_name: "Williams".to_string(),
            grade_level: "10".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2010, 6, 15).unwrap(),
            disability: DisabilityCategory::Autism,
            organization: "Lincoln USD".to_string(),
        };
        assert_eq!(
            student.age_on(NaiveDate::from_ymd_opt(2026, 6, 14).unwrap()),
            15
        );
        assert_eq!(
            student.age_on(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()),
            16
        );
    }
}
