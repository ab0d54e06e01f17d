use thiserror::Error;

/// Errors raised while rebuilding a run from a checkpoint.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Malformed checkpoint field `{field}`: {reason}")]
    Malformed { field: String, reason: String },

    #[error("Unsupported checkpoint: unknown keys {keys:?}")]
    Unsupported { keys: Vec<String> },
}

impl CheckpointError {
    pub fn malformed(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

pub type CheckpointResult<T> = std::result::Result<T, CheckpointError>;

/// A cross-field consistency rule a pipeline state breaks.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("next_chapter_index {cursor} does not match {completed} completed chapters")]
    CursorMismatch { cursor: usize, completed: usize },

    #[error("next_chapter_index {cursor} exceeds num_chapters {num_chapters}")]
    CursorBeyondTarget { cursor: usize, num_chapters: u32 },

    #[error("chapters_overview has {overview} entries but num_chapters is {num_chapters}")]
    OverviewLength { overview: usize, num_chapters: u32 },

    #[error("overview_validated is set without a chapters_overview")]
    ValidatedWithoutOverview,

    #[error("pending_validation_index {index} is outside the {overview} planned chapters")]
    PendingOutOfRange { index: usize, overview: usize },
}
