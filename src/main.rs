use anyhow::Result;
use novelforge::core::checkpoint;
use novelforge::core::config::Config;
use novelforge::core::io::{NativeStorage, Storage};
use novelforge::core::state::PipelineState;
use novelforge::services::stages::Stage;

const LOG_TAIL: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists.");
            return Err(e);
        }
    };

    let storage = NativeStorage::new();
    let path = config.checkpoint_path().to_string_lossy().into_owned();
    if !storage.exists(&path).await? {
        println!("No checkpoint at {}", path);
        return Ok(());
    }

    let map = checkpoint::decode(&storage.read(&path).await?)?;
    let state = PipelineState::from_checkpoint(&map, config.checkpoint.unknown_keys)?;
    if let Err(violation) = state.check_invariants() {
        log::warn!("Checkpoint is inconsistent: {}", violation);
    }

    println!("Checkpoint: {}", path);
    if let Some(genre) = &state.genre {
        println!("Genre: {}", genre);
    }
    println!(
        "Chapters drafted: {}/{}",
        state.chapters_full.len(),
        state
            .num_chapters
            .map_or_else(|| "?".to_string(), |n| n.to_string())
    );
    println!("Next stage: {}", Stage::select(&state));

    let skip = state.status_log.len().saturating_sub(LOG_TAIL);
    for line in &state.status_log[skip..] {
        println!("  {}", line);
    }

    Ok(())
}
