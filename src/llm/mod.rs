// src/llm/mod.rs
pub mod gemini;

use crate::error::ProviderError;
use crate::transcript::Turn;
use async_trait::async_trait;

/// The hosted model: send a prompt, get text back.
#[async_trait]
pub trait Generator {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        input: &str,
    ) -> Result<String, ProviderError>;
}
