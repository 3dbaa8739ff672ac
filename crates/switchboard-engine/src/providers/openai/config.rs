//! OpenAI client configuration.

use std::fmt;

use switchboard_common::ModelError;

pub(crate) const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    /// Configuration for api.openai.com from `OPENAI_API_KEY`, with
    /// `OPENAI_BASE_URL` overriding the default endpoint.
    pub fn from_env() -> Result<Self, ModelError> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::NotConfigured("OPENAI_API_KEY not set".into()))?;
        let mut config = Self::new(key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    /// Configuration for OpenRouter from `OPENROUTER_API_KEY`, with
    /// `OPENROUTER_BASE_URL` overriding the default endpoint.
    pub fn openrouter_from_env() -> Result<Self, ModelError> {
        let key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| ModelError::NotConfigured("OPENROUTER_API_KEY not set".into()))?;
        let mut config = Self::new(key);
        config.base_url = std::env::var("OPENROUTER_BASE_URL")
            .unwrap_or_else(|_| OPENROUTER_BASE_URL.to_string());
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}
