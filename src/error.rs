use thiserror::Error;
use uuid::Uuid;

// Validation and state errors surfaced to the caller. All are recoverable:
// the write is rejected and the reason is shown to the user.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid measurement: {0}")]
    InvalidMeasurement(String),

    #[error("goal {0} is closed and no longer accepts progress data")]
    GoalClosed(Uuid),

    #[error("invalid behavior event: {0}")]
    InvalidEvent(String),

    #[error("goal {goal_id} was modified concurrently (expected version {expected})")]
    ConcurrentModification { goal_id: Uuid, expected: i64 },

    #[error("{0} not found")]
    NotFound(String),
}
