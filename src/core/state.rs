use crate::core::checkpoint::{self, CheckpointMap, Record, UnknownKeyPolicy};
use crate::core::error::{CheckpointError, CheckpointResult, InvariantViolation};
use crate::utils::time;
use log::{info, warn};
use serde_json::{json, Value};

/// Everything a generation run has produced so far.
///
/// Stage workers read and write these fields directly. A state belongs to
/// one run driven from one thread; hosts that share it must lock it
/// themselves. `status_log` is append-only: write it through [`log`](Self::log).
#[derive(Default, Clone, Debug, PartialEq)]
pub struct PipelineState {
    pub genre: Option<String>,
    pub plot: Option<String>,
    pub num_chapters: Option<u32>,
    pub run_mode: Option<String>,
    /// Author/narrator/POV configuration.
    pub anpc: Option<String>,
    pub expanded_plot: Option<String>,
    pub chapters_overview: Option<Vec<Record>>,
    pub overview_validated: bool,
    /// Drafted chapters, index-aligned with `chapters_overview`.
    pub chapters_full: Vec<String>,
    pub next_chapter_index: Option<usize>,
    pub pending_validation_index: Option<usize>,
    pub validation_text: String,
    /// One-shot interactive input for the current step. Never checkpointed.
    pub choices: Option<Value>,
    pub status_log: Vec<String>,
}

impl PipelineState {
    /// Detached snapshot holding exactly the persisted keys.
    pub fn project(&self) -> CheckpointMap {
        let mut map = CheckpointMap::new();
        map.insert("expanded_plot".into(), json!(self.expanded_plot));
        map.insert("chapters_overview".into(), json!(self.chapters_overview));
        map.insert("chapters_full".into(), json!(self.chapters_full));
        map.insert("validation_text".into(), json!(self.validation_text));
        map.insert("status_log".into(), json!(self.status_log));
        map.insert("next_chapter_index".into(), json!(self.next_chapter_index));
        map.insert("genre".into(), json!(self.genre));
        map.insert("anpc".into(), json!(self.anpc));
        map.insert("plot".into(), json!(self.plot));
        map.insert("num_chapters".into(), json!(self.num_chapters));
        map.insert("run_mode".into(), json!(self.run_mode));
        map.insert("overview_validated".into(), json!(self.overview_validated));
        map.insert(
            "pending_validation_index".into(),
            json!(self.pending_validation_index),
        );
        map
    }

    /// Rebuilds a state from a checkpoint. Missing keys take their defaults
    /// and `choices` always starts unset.
    pub fn from_checkpoint(map: &CheckpointMap, policy: UnknownKeyPolicy) -> CheckpointResult<Self> {
        let unknown = checkpoint::unknown_keys(map);
        if !unknown.is_empty() {
            match policy {
                UnknownKeyPolicy::Strict => {
                    return Err(CheckpointError::Unsupported { keys: unknown })
                }
                UnknownKeyPolicy::Lenient => {
                    for key in &unknown {
                        warn!("Ignoring unknown checkpoint key: {}", key);
                    }
                }
            }
        }

        let num_chapters: Option<u32> = checkpoint::optional(map, "num_chapters")?;
        if num_chapters == Some(0) {
            return Err(CheckpointError::malformed("num_chapters", "must be positive"));
        }

        Ok(Self {
            genre: checkpoint::optional(map, "genre")?,
            plot: checkpoint::optional(map, "plot")?,
            num_chapters,
            run_mode: checkpoint::optional(map, "run_mode")?,
            anpc: checkpoint::optional(map, "anpc")?,
            expanded_plot: checkpoint::optional(map, "expanded_plot")?,
            chapters_overview: checkpoint::optional(map, "chapters_overview")?,
            overview_validated: checkpoint::defaulted(map, "overview_validated")?,
            chapters_full: checkpoint::defaulted(map, "chapters_full")?,
            next_chapter_index: checkpoint::optional(map, "next_chapter_index")?,
            pending_validation_index: checkpoint::optional(map, "pending_validation_index")?,
            validation_text: checkpoint::defaulted(map, "validation_text")?,
            choices: None,
            status_log: checkpoint::defaulted(map, "status_log")?,
        })
    }

    /// Appends a timestamped line to `status_log`.
    pub fn log(&mut self, message: impl AsRef<str>) {
        let line = time::log_line(message.as_ref());
        info!("{}", line);
        self.status_log.push(line);
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let completed = self.chapters_full.len();

        if let Some(cursor) = self.next_chapter_index {
            if cursor != completed {
                return Err(InvariantViolation::CursorMismatch { cursor, completed });
            }
            if let Some(num_chapters) = self.num_chapters {
                if cursor > num_chapters as usize {
                    return Err(InvariantViolation::CursorBeyondTarget { cursor, num_chapters });
                }
            }
        }

        match &self.chapters_overview {
            Some(overview) => {
                if let Some(num_chapters) = self.num_chapters {
                    if overview.len() != num_chapters as usize {
                        return Err(InvariantViolation::OverviewLength {
                            overview: overview.len(),
                            num_chapters,
                        });
                    }
                }
            }
            None if self.overview_validated => {
                return Err(InvariantViolation::ValidatedWithoutOverview)
            }
            None => {}
        }

        if let Some(index) = self.pending_validation_index {
            let overview = self.chapters_overview.as_ref().map_or(0, Vec::len);
            if index >= overview {
                return Err(InvariantViolation::PendingOutOfRange { index, overview });
            }
        }

        Ok(())
    }
}
