//! Integrations: the external capabilities models may call.
//!
//! An [`Integration`] bundles a name, a human description, a flat
//! argument schema, and the handler that does the work. The engine
//! holds them in an [`IntegrationSet`] built once at startup; nothing
//! mutates the set afterwards, so lookups need no locking.

pub mod datetime;
pub mod runner;
pub mod weather;

pub use runner::{Decision, IntegrationRunner};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use switchboard_common::new_id;

use crate::{ToolCall, ToolSchema};

/// Request kind stamped on every integration request.
pub const TOOL_CALL_KIND: &str = "tool_call";

/// One argument in an integration's schema. All arguments are strings
/// on the wire; handlers parse further as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub description: String,
    pub required: bool,
}

/// A callable capability exposed to models.
pub struct Integration {
    name: String,
    description: String,
    schema: BTreeMap<String, Argument>,
    handler: Arc<dyn IntegrationHandler>,
}

impl Integration {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn IntegrationHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: BTreeMap::new(),
            handler,
        }
    }

    pub fn with_argument(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.schema.insert(
            name.into(),
            Argument {
                description: description.into(),
                required,
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn handler(&self) -> &Arc<dyn IntegrationHandler> {
        &self.handler
    }

    /// The argument schema as a JSON Schema object, the shape models
    /// and result provenance both carry.
    pub fn schema_json(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for (name, argument) in &self.schema {
            properties.insert(
                name.clone(),
                serde_json::json!({
                    "type": "string",
                    "description": argument.description,
                }),
            );
            if argument.required {
                required.push(Value::String(name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.schema_json(),
        }
    }
}

impl fmt::Debug for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integration")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Does the actual work behind an integration. Errors returned here
/// are contained by the runner; they never abort sibling calls.
#[async_trait]
pub trait IntegrationHandler: Send + Sync {
    async fn call(&self, args: &Value) -> Result<HandlerReply, HandlerError>;
}

/// What a handler hands back on success.
#[derive(Debug, Clone)]
pub struct HandlerReply {
    pub status: IntegrationStatus,
    pub content: String,
    pub attachments: Option<Vec<Value>>,
    pub metadata: Option<Value>,
}

impl HandlerReply {
    pub fn completed(content: impl Into<String>) -> Self {
        Self {
            status: IntegrationStatus::Completed,
            content: content.into(),
            attachments: None,
            metadata: None,
        }
    }

    pub fn failed(content: impl Into<String>) -> Self {
        Self {
            status: IntegrationStatus::Failed,
            content: content.into(),
            attachments: None,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for HandlerError {
    fn from(err: reqwest::Error) -> Self {
        HandlerError::Network(err.to_string())
    }
}

/// Lifecycle of one integration invocation. The engine itself only
/// assigns `completed` and `fatal`; the rest exist for handlers that
/// hand off work elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Submitted,
    Queued,
    Pending,
    Completed,
    Failed,
    Fatal,
}

impl IntegrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationStatus::Submitted => "submitted",
            IntegrationStatus::Queued => "queued",
            IntegrationStatus::Pending => "pending",
            IntegrationStatus::Completed => "completed",
            IntegrationStatus::Failed => "failed",
            IntegrationStatus::Fatal => "fatal",
        }
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete request to invoke one integration, produced by the
/// decision phase and persisted on the assistant message that acted
/// on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRequest {
    pub name: String,
    pub id: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub args: Value,
}

fn default_kind() -> String {
    TOOL_CALL_KIND.to_string()
}

impl IntegrationRequest {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            id: new_id(),
            kind: default_kind(),
            args,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn as_tool_call(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: self.args.clone(),
        }
    }
}

/// Which integration produced a result, echoing both its registered
/// schema and the arguments actually passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub arguments: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed_arguments: Option<Value>,
}

/// Outcome of one integration invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResult {
    pub status: IntegrationStatus,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub integration: IntegrationInfo,
}

/// Immutable name-to-integration map, built once at startup.
pub struct IntegrationSet {
    ordered: Vec<Arc<Integration>>,
    by_name: HashMap<String, Arc<Integration>>,
}

impl IntegrationSet {
    /// Build the set. On a duplicate name the first registration wins.
    pub fn new(integrations: Vec<Integration>) -> Self {
        let mut ordered = Vec::with_capacity(integrations.len());
        let mut by_name = HashMap::new();
        for integration in integrations {
            if by_name.contains_key(integration.name()) {
                warn!(name = %integration.name(), "duplicate integration name, keeping first");
                continue;
            }
            let integration = Arc::new(integration);
            by_name.insert(integration.name().to_string(), integration.clone());
            ordered.push(integration);
        }
        Self { ordered, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Integration>> {
        self.by_name.get(name)
    }

    /// Tool schemas in registration order, for binding to a model.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.ordered.iter().map(|i| i.to_schema()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.ordered.iter().map(|i| i.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// The integrations shipped with the engine.
pub fn builtin_integrations() -> Vec<Integration> {
    vec![weather::current_weather(), datetime::current_datetime()]
}
