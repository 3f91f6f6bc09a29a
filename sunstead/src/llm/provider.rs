use std::sync::Arc;

use serde_json::Value;

use crate::config::{parse_provider_model, LlmConfig};
use crate::error::{Result, SunsteadError};
use crate::llm::api::LlmApiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    LlmBackend::Unavailable {
                        reason: format!("Unknown provider in model: {}", config.model),
                    }
                }
            }
        };

        Self {
            backend,
            config: Some(Arc::new(config.clone())),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    pub async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        let client = self.client()?;
        client.complete(prompt, system_prompt, options).await
    }

    pub async fn complete_json(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<Value> {
        let client = self.client()?;
        client.complete_json(prompt, system_prompt, options).await
    }

    fn client(&self) -> Result<LlmApiClient> {
        if !self.is_available() {
            return Err(SunsteadError::LlmUnavailable(self.unavailable_reason()));
        }

        let config = self
            .config()
            .ok_or_else(|| SunsteadError::LlmUnavailable("No config available".to_string()))?;

        LlmApiClient::new(config)
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM completion is not available".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_unavailable() {
        let provider = LlmProvider::new(None);
        assert!(!provider.is_available());
    }

    #[test]
    fn known_provider_prefix_selects_backend() {
        let config = LlmConfig {
            model: "openrouter/some-model".to_string(),
            api_key: Some("key".to_string()),
            base_url: None,
            timeout_secs: 30,
            max_retries: 1,
        };
        let provider = LlmProvider::new(Some(&config));
        assert_eq!(provider.backend(), &LlmBackend::OpenRouter);
    }

    #[test]
    fn unknown_provider_with_base_url_is_compatible() {
        let config = LlmConfig {
            model: "my-fine-tune".to_string(),
            api_key: None,
            base_url: Some("http://inference.lan:8080/v1".to_string()),
            timeout_secs: 30,
            max_retries: 1,
        };
        let provider = LlmProvider::new(Some(&config));
        assert!(matches!(
            provider.backend(),
            LlmBackend::OpenAICompatible { .. }
        ));
    }

    #[tokio::test]
    async fn unavailable_complete_returns_typed_error() {
        let provider = LlmProvider::unavailable("test");
        let err = provider.complete("hi", None, None).await.unwrap_err();
        assert!(matches!(err, SunsteadError::LlmUnavailable(_)));
    }
}
