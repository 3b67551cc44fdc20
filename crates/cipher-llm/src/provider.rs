use async_trait::async_trait;

use crate::error::Result;

/// Single-shot text completion.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn complete(&self, prompt: &str, system_instruction: &str) -> Result<String>;
}
