use anyhow::Result;
use async_trait::async_trait;

/// Where checkpoints are kept. Paths are opaque keys to implementations.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Local filesystem storage.
#[derive(Debug, Default)]
pub struct NativeStorage;

impl NativeStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for NativeStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        // Readers only ever see a complete file.
        let staging = format!("{}.tmp", path);
        tokio::fs::write(&staging, content).await?;
        if let Err(e) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if tokio::fs::try_exists(path).await? {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn test_native_roundtrip() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("nested").join("checkpoint.json");
        let path_str = path.to_str().unwrap();
        let storage = NativeStorage::new();

        assert!(!storage.exists(path_str).await?);
        storage.write(path_str, b"{\"a\":1}").await?;
        storage.write(path_str, b"{}").await?;
        assert!(storage.exists(path_str).await?);
        assert_eq!(storage.read(path_str).await?, b"{}");
        assert!(!Path::new(&format!("{}.tmp", path_str)).exists());

        storage.delete(path_str).await?;
        storage.delete(path_str).await?;
        assert!(!storage.exists(path_str).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_write_removes_staging_file() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("checkpoint.json");
        std::fs::create_dir_all(path.join("occupied"))?;
        let path_str = path.to_str().unwrap();
        let storage = NativeStorage::new();

        assert!(storage.write(path_str, b"{}").await.is_err());
        assert!(!Path::new(&format!("{}.tmp", path_str)).exists());
        assert!(path.is_dir());
        Ok(())
    }
}
