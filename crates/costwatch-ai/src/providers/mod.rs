pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

/// A text completion backend: prompt in, text out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn provider(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Runs one completion with `system` as the system instruction.
    async fn complete(&self, prompt: &str, system: &str) -> Result<String>;
}
