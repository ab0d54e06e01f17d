use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::checkpoint::UnknownKeyPolicy;

const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_build")]
    pub build_folder: String,

    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: String,

    /// Never stop to ask before drafting the next chapter.
    #[serde(default)]
    pub unattended: bool,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub unknown_keys: UnknownKeyPolicy,
}

fn default_build() -> String {
    "build".to_string()
}
fn default_checkpoint_file() -> String {
    "checkpoint.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_folder: default_build(),
            checkpoint_file: default_checkpoint_file(),
            unattended: false,
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            anyhow::bail!("{} not found. Please create one.", CONFIG_FILE);
        }
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(CONFIG_FILE, content).context("Failed to write config.yml")?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.build_folder)?;
        Ok(())
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        Path::new(&self.build_folder).join(&self.checkpoint_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() -> Result<()> {
        let config: Config = serde_yaml_ng::from_str("{}")?;
        assert_eq!(config.build_folder, "build");
        assert_eq!(config.checkpoint_path(), Path::new("build").join("checkpoint.json"));
        assert!(!config.unattended);
        assert_eq!(config.checkpoint.unknown_keys, UnknownKeyPolicy::Lenient);
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("config.yml");
        fs::write(
            &path,
            "build_folder: out\nunattended: true\ncheckpoint:\n  unknown_keys: strict\n",
        )?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.build_folder, "out");
        assert!(config.unattended);
        assert_eq!(config.checkpoint.unknown_keys, UnknownKeyPolicy::Strict);
        Ok(())
    }

    #[test]
    fn test_load_from_rejects_bad_policy() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("config.yml");
        fs::write(&path, "checkpoint:\n  unknown_keys: sometimes\n")?;

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
        Ok(())
    }
}
