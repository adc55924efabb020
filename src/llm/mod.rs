pub mod gemini;

pub use gemini::GeminiClient;

use anyhow::Result;
use async_trait::async_trait;

/// Prompt in, prose out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model's text; an empty string when the model produced none
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Strip markdown code fences the model may wrap JSON in
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
