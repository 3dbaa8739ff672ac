//! Engine settings: TOML file plus environment overrides.
//!
//! Resolution order is defaults, then the config file, then
//! `SWITCHBOARD_*` environment variables. Invalid override values are
//! warned about and ignored rather than failing startup.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use switchboard_common::{ConfigError, ConversationId};

use crate::providers::ProviderKind;
use crate::session::SessionOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub models: ModelSettings,
    pub store: StoreSettings,
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider and model that answer the user.
    pub provider: ProviderKind,
    pub model: String,
    /// Provider and model that decide which integrations to invoke.
    pub caller_provider: ProviderKind,
    pub caller_model: String,
    /// Optional distinct model for answering from integration results.
    /// Falls back to the primary model when unset.
    pub grounding_provider: Option<ProviderKind>,
    pub grounding_model: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            caller_provider: ProviderKind::Ollama,
            caller_model: "llama3.1".to_string(),
            grounding_provider: None,
            grounding_model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Database file for the redb backend. Defaults to
    /// `<data dir>/switchboard/history.redb`.
    pub path: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redb,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redb" => Ok(StoreBackend::Redb),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::ValidationError(format!(
                "unknown store backend: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Deadline for a single model call, in seconds.
    pub model_timeout_secs: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            model_timeout_secs: 120,
        }
    }
}

impl Settings {
    /// Load settings. An explicit path (argument or
    /// `SWITCHBOARD_CONFIG`) must exist; the platform default path may
    /// be absent, which simply means defaults. Environment overrides
    /// apply last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("SWITCHBOARD_CONFIG").ok().map(PathBuf::from));

        let mut settings = if let Some(path) = named {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            Self::load_from_path(&path)?
        } else {
            let path = default_config_path()?;
            if path.exists() {
                Self::load_from_path(&path)?
            } else {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Load settings from a specific TOML file. Missing fields take
    /// their defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
        })?;
        let settings = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;
        debug!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    pub(crate) fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(value) = get("SWITCHBOARD_PROVIDER") {
            if let Some(kind) = parse_provider(&value, "SWITCHBOARD_PROVIDER") {
                self.models.provider = kind;
            }
        }
        if let Some(value) = get("SWITCHBOARD_MODEL") {
            self.models.model = value;
        }
        if let Some(value) = get("SWITCHBOARD_CALLER_PROVIDER") {
            if let Some(kind) = parse_provider(&value, "SWITCHBOARD_CALLER_PROVIDER") {
                self.models.caller_provider = kind;
            }
        }
        if let Some(value) = get("SWITCHBOARD_CALLER_MODEL") {
            self.models.caller_model = value;
        }
        if let Some(value) = get("SWITCHBOARD_GROUNDING_PROVIDER") {
            if let Some(kind) = parse_provider(&value, "SWITCHBOARD_GROUNDING_PROVIDER") {
                self.models.grounding_provider = Some(kind);
            }
        }
        if let Some(value) = get("SWITCHBOARD_GROUNDING_MODEL") {
            self.models.grounding_model = Some(value);
        }
        if let Some(value) = get("SWITCHBOARD_STORE_BACKEND") {
            match value.parse() {
                Ok(backend) => self.store.backend = backend,
                Err(err) => {
                    warn!(error = %err, "ignoring invalid SWITCHBOARD_STORE_BACKEND");
                }
            }
        }
        if let Some(value) = get("SWITCHBOARD_STORE_PATH") {
            self.store.path = Some(PathBuf::from(value));
        }
        if let Some(value) = get("SWITCHBOARD_MODEL_TIMEOUT_SECS") {
            match value.parse() {
                Ok(secs) => self.limits.model_timeout_secs = secs,
                Err(_) => {
                    warn!(value, "ignoring invalid SWITCHBOARD_MODEL_TIMEOUT_SECS");
                }
            }
        }
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.model_timeout_secs)
    }

    /// Where the redb backend keeps its database.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or_else(|| {
            ConfigError::ValidationError("could not determine data directory".into())
        })?;
        Ok(data_dir.join("switchboard").join("history.redb"))
    }

    /// Session options for one conversation, from the configured model
    /// roles.
    pub fn session_options(&self, conversation: ConversationId) -> SessionOptions {
        SessionOptions {
            conversation,
            provider: self.models.provider,
            model: self.models.model.clone(),
            caller_provider: self.models.caller_provider,
            caller_model: self.models.caller_model.clone(),
            grounding_provider: self.models.grounding_provider,
            grounding_model: self.models.grounding_model.clone(),
        }
    }
}

fn parse_provider(value: &str, field: &str) -> Option<ProviderKind> {
    match value.parse() {
        Ok(kind) => Some(kind),
        Err(err) => {
            warn!(field, error = %err, "ignoring invalid provider override");
            None
        }
    }
}

/// The platform-specific default config file path.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ValidationError("could not determine config directory".into())
    })?;
    Ok(config_dir.join("switchboard").join("config.toml"))
}
