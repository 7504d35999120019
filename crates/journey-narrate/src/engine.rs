use std::time::Duration;

use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use thiserror::Error;

use journey_core::AiSettings;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation not configured: {0}")]
    Config(String),
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation returned empty text")]
    Empty,
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

/// External text generation. Implementations may fail for any reason; the
/// narrator never passes those failures on.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerateError>;
}

fn map_backend(provider: &str) -> Result<LLMBackend, GenerateError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(GenerateError::Config(format!("unknown provider: {other}"))),
    }
}

/// [`TextGenerator`] backed by a hosted model through the `llm` crate.
/// Unbounded on its own; callers impose the timeout.
pub struct LlmGenerator {
    settings: AiSettings,
}

impl LlmGenerator {
    pub fn new(settings: AiSettings) -> Self {
        Self { settings }
    }

    /// The call bound configured in the settings, never below one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs.max(1))
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerateError> {
        let settings = &self.settings;
        if !journey_core::ai_configured(settings) {
            return Err(GenerateError::Config(format!(
                "provider '{}' is missing a model or API key",
                settings.provider
            )));
        }
        let backend = map_backend(&settings.provider)?;

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .model(&settings.model)
            .system(system);

        if !settings.api_key.is_empty() {
            builder = builder.api_key(&settings.api_key);
        }

        let llm = builder
            .build()
            .map_err(|e| GenerateError::Config(format!("build LLM: {e}")))?;

        let messages = vec![ChatMessage::user().content(prompt).build()];

        let response = llm
            .chat(&messages)
            .await
            .map_err(|e| GenerateError::Request(format!("chat: {e}")))?;

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GenerateError::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_map_to_backends() {
        for provider in ["openai", "anthropic", "google", "ollama", "groq", "mistral", "deepseek"] {
            assert!(map_backend(provider).is_ok(), "{provider}");
        }
        assert!(matches!(map_backend("gemini"), Err(GenerateError::Config(_))));
    }

    #[test]
    fn timeout_comes_from_settings_with_a_floor() {
        let generator = LlmGenerator::new(AiSettings {
            timeout_secs: 0,
            ..AiSettings::default()
        });
        assert_eq!(generator.timeout(), Duration::from_secs(1));
        assert_eq!(LlmGenerator::new(AiSettings::default()).timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn unconfigured_settings_fail_without_network() {
        let generator = LlmGenerator::new(AiSettings::default());
        let err = generator
            .generate("system", "prompt")
            .await
            .expect_err("no api key configured");
        assert!(matches!(err, GenerateError::Config(_)));
    }
}
