//! Model provider clients.
//!
//! Each provider implements [`crate::ChatModel`] over its own wire
//! format. [`build`] is the factory: given a provider kind and model
//! name it produces a ready client from environment credentials.

pub mod ollama;
pub mod openai;

pub use ollama::{OllamaChatModel, OllamaConfig};
pub use openai::{OpenAiChatModel, OpenAiConfig};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use switchboard_common::{ConfigError, ModelError};

use crate::ChatModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(ConfigError::ValidationError(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// Build a client for `kind` from environment configuration.
pub fn build(kind: ProviderKind, model: &str) -> Result<Arc<dyn ChatModel>, ModelError> {
    match kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiChatModel::new(
            OpenAiConfig::from_env()?.with_model(model),
        ))),
        ProviderKind::OpenRouter => Ok(Arc::new(OpenAiChatModel::new(
            OpenAiConfig::openrouter_from_env()?.with_model(model),
        ))),
        ProviderKind::Ollama => Ok(Arc::new(OllamaChatModel::new(
            OllamaConfig::from_env().with_model(model),
        ))),
    }
}
