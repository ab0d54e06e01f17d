use crate::core::checkpoint;
use crate::core::config::Config;
use crate::core::io::Storage;
use crate::core::state::PipelineState;
use crate::services::llm::LlmClient;
use crate::services::stages::{Stage, StageKind, StageWorker};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

const INTERACTIVE_MODE: &str = "interactive";

/// Drives one run stage by stage, checkpointing after each.
pub struct WorkflowManager {
    config: Config,
    llm: Box<dyn LlmClient>,
    workers: HashMap<StageKind, Box<dyn StageWorker>>,
    state: PipelineState,
    storage: Arc<dyn Storage>,
}

impl WorkflowManager {
    /// Resumes from the stored checkpoint if there is one; `initial` is only
    /// used for a fresh run.
    pub async fn new(
        config: Config,
        initial: PipelineState,
        llm: Box<dyn LlmClient>,
        workers: Vec<Box<dyn StageWorker>>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let mut by_kind = HashMap::new();
        for worker in workers {
            let kind = worker.kind();
            if by_kind.insert(kind, worker).is_some() {
                bail!("More than one worker registered for {:?}", kind);
            }
        }

        let state = match Self::load_state(&config, storage.as_ref()).await? {
            Some(state) => {
                info!(
                    "Resuming from {} at {}",
                    config.checkpoint_path().display(),
                    Stage::select(&state)
                );
                if let Err(violation) = state.check_invariants() {
                    warn!("Checkpoint is inconsistent: {}", violation);
                }
                state
            }
            None => initial,
        };

        Ok(Self {
            config,
            llm,
            workers: by_kind,
            state,
            storage,
        })
    }

    async fn load_state(config: &Config, storage: &dyn Storage) -> Result<Option<PipelineState>> {
        let path = checkpoint_key(config);
        if !storage.exists(&path).await? {
            return Ok(None);
        }
        let bytes = storage.read(&path).await?;
        let map = checkpoint::decode(&bytes).with_context(|| format!("Failed to load {}", path))?;
        let state = PipelineState::from_checkpoint(&map, config.checkpoint.unknown_keys)
            .with_context(|| format!("Failed to load {}", path))?;
        Ok(Some(state))
    }

    async fn save_state(&self) -> Result<()> {
        let path = checkpoint_key(&self.config);
        let content = checkpoint::encode(&self.state.project())?;
        self.storage.write(&path, content.as_bytes()).await?;
        Ok(())
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Mutable access for the interactive layer, e.g. to set `choices`
    /// before the next step.
    pub fn state_mut(&mut self) -> &mut PipelineState {
        &mut self.state
    }

    pub fn next_stage(&self) -> Stage {
        Stage::select(&self.state)
    }

    /// Runs the selected stage and checkpoints. Returns the stage that ran,
    /// or [`Stage::Complete`] when nothing is left.
    pub async fn step(&mut self) -> Result<Stage> {
        let stage = Stage::select(&self.state);
        let Some(kind) = stage.kind() else {
            return Ok(stage);
        };
        let worker = self
            .workers
            .get(&kind)
            .with_context(|| format!("No worker registered for {}", stage))?;

        info!("Starting {}", stage);
        // Workers write into a copy; a failed stage leaves the run untouched.
        let mut next = self.state.clone();
        worker
            .run(stage, &mut next, self.llm.as_ref())
            .await
            .with_context(|| format!("{} failed", stage))?;

        if Stage::select(&next) == stage {
            bail!("{} made no progress", stage);
        }

        // Choices are input for a single step.
        next.choices = None;
        next.log(format!("{} complete", stage));
        self.state = next;
        self.save_state().await?;
        Ok(stage)
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            let stage = self.step().await?;
            if stage == Stage::Complete {
                break;
            }

            let drafting_next = matches!(self.next_stage(), Stage::DraftChapter(i) if i > 0);
            if drafting_next && self.is_interactive() && !self.confirm_continue() {
                println!("Stopping as requested.");
                return Ok(());
            }
        }

        info!("All stages complete!");
        Ok(())
    }

    pub async fn discard_checkpoint(&self) -> Result<()> {
        self.storage.delete(&checkpoint_key(&self.config)).await
    }

    fn is_interactive(&self) -> bool {
        !self.config.unattended && self.state.run_mode.as_deref() == Some(INTERACTIVE_MODE)
    }

    fn confirm_continue(&self) -> bool {
        let ans = inquire::Confirm::new("Continue to next chapter?")
            .with_default(true)
            .prompt();

        match ans {
            Ok(answer) => answer,
            Err(_) => {
                println!("Error reading input, stopping.");
                false
            }
        }
    }
}

fn checkpoint_key(config: &Config) -> String {
    config.checkpoint_path().to_string_lossy().into_owned()
}
