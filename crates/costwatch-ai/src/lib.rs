pub mod generator;
pub mod models;
pub mod prompt;
pub mod providers;
pub mod rules;

use anyhow::Result;
use std::sync::Arc;

pub use generator::{InsightGenerator, LiveGenerator, NullGenerator, Prediction};
pub use providers::openai::{AiSettings, OpenAiCompatProvider};
pub use providers::CompletionProvider;

/// Picks the generator once at startup.
///
/// A live generator is built only when AI is enabled and an API key is
/// present; otherwise the rule-based [`NullGenerator`] is returned.
pub fn build_generator(enabled: bool, settings: AiSettings) -> Result<Arc<dyn InsightGenerator>> {
    if !enabled || settings.api_key.is_empty() {
        tracing::info!("AI insights not configured, using rule-based analysis");
        return Ok(Arc::new(NullGenerator));
    }
    let model = settings.model.clone();
    let provider = OpenAiCompatProvider::new(settings)?;
    tracing::info!(model = %model, "AI insights enabled");
    Ok(Arc::new(LiveGenerator::new(Arc::new(provider))))
}
