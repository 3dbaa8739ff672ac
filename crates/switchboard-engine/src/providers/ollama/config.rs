//! Ollama client configuration. No credentials; just an endpoint.

pub(crate) const OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl OllamaConfig {
    pub fn new() -> Self {
        Self {
            base_url: OLLAMA_BASE_URL.to_string(),
            model: "llama3.1".to_string(),
        }
    }

    /// Configuration from the environment. `OLLAMA_BASE_URL` overrides
    /// the local default; a missing variable is not an error.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(base_url) = std::env::var("OLLAMA_BASE_URL") {
            config.base_url = base_url;
        }
        config
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

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new()
    }
}
