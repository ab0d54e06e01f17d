use crate::core::state::PipelineState;
use crate::services::llm::LlmClient;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    ExpandPlot,
    PlanChapters,
    ValidateOverview,
    DraftChapter,
    ValidateChapter,
}

/// The next unit of work for a run, derived from its progress cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExpandPlot,
    PlanChapters,
    ValidateOverview,
    DraftChapter(usize),
    ValidateChapter(usize),
    Complete,
}

impl Stage {
    pub fn select(state: &PipelineState) -> Self {
        if state.expanded_plot.is_none() {
            return Stage::ExpandPlot;
        }
        let Some(overview) = &state.chapters_overview else {
            return Stage::PlanChapters;
        };
        if !state.overview_validated {
            return Stage::ValidateOverview;
        }
        if let Some(index) = state.pending_validation_index {
            return Stage::ValidateChapter(index);
        }

        // Drafted chapters are the source of truth; a disagreeing
        // `next_chapter_index` is reported by `check_invariants`.
        let cursor = state.chapters_full.len();
        let target = state
            .num_chapters
            .map_or(overview.len(), |n| n as usize);
        if cursor < target {
            Stage::DraftChapter(cursor)
        } else {
            Stage::Complete
        }
    }

    pub fn kind(&self) -> Option<StageKind> {
        match self {
            Stage::ExpandPlot => Some(StageKind::ExpandPlot),
            Stage::PlanChapters => Some(StageKind::PlanChapters),
            Stage::ValidateOverview => Some(StageKind::ValidateOverview),
            Stage::DraftChapter(_) => Some(StageKind::DraftChapter),
            Stage::ValidateChapter(_) => Some(StageKind::ValidateChapter),
            Stage::Complete => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ExpandPlot => write!(f, "plot expansion"),
            Stage::PlanChapters => write!(f, "chapter planning"),
            Stage::ValidateOverview => write!(f, "overview validation"),
            Stage::DraftChapter(i) => write!(f, "chapter {} drafting", i + 1),
            Stage::ValidateChapter(i) => write!(f, "chapter {} validation", i + 1),
            Stage::Complete => write!(f, "complete"),
        }
    }
}

/// Produces one stage's artifacts by writing them into the state.
///
/// A worker must move the run forward: after a successful `run`,
/// [`Stage::select`] has to pick something other than `stage`. Workers that
/// plan inter-chapter transitions publish them to a
/// [`TransitionsCache`](crate::core::transitions::TransitionsCache), not the state.
#[async_trait]
pub trait StageWorker: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, stage: Stage, state: &mut PipelineState, llm: &dyn LlmClient) -> Result<()>;
}
