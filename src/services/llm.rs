use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Chat-completion endpoint used by stage workers.
#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    async fn chat(&self, system: &str, user: &str) -> Result<String>;
}
