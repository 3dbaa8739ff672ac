//! Conversation engine for Switchboard.
//!
//! Provides durable per-conversation message history, model-facing
//! message transformation, integration (tool) invocation, and the
//! two-phase chat session that ties them together:
//! - A caller model decides which integrations to invoke
//! - Integrations run sequentially, failures contained per call
//! - A grounding model answers from the integration results
//!
//! Every turn is persisted before any model is consulted, so a model
//! outage never loses user input.

pub mod history;
pub mod integrations;
pub mod providers;
pub mod session;
pub mod settings;
pub mod store;
pub mod transform;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use switchboard_common::{new_id, ModelError};

pub use history::History;
pub use integrations::{
    builtin_integrations, Argument, HandlerError, HandlerReply, Integration, IntegrationHandler,
    IntegrationInfo, IntegrationRequest, IntegrationResult, IntegrationRunner, IntegrationSet,
    IntegrationStatus,
};
pub use providers::{OllamaChatModel, OllamaConfig, OpenAiChatModel, OpenAiConfig, ProviderKind};
pub use session::{
    ChatSession, DegradeCause, EngineContext, ModelPool, SessionOptions, TurnOutcome, TurnReply,
};
pub use settings::{Settings, StoreBackend};
pub use store::{ByteStore, MemoryStore, RedbStore};
pub use transform::transform;

/// Reply content substituted whenever a model call fails or times out.
/// The failure never escapes to the caller as an error.
pub const APOLOGY_CONTENT: &str =
    "An error occurred while processing your request. Please try again later.";

/// A persisted conversation message. This is the durable shape: it is
/// what goes into the store, byte for byte, as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    /// Who authored the message. Only meaningful for user messages;
    /// defaulted to sentinel values when decoded from a record that
    /// lacks it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    /// Integration requests an assistant message acted on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<IntegrationRequest>>,
    /// For tool messages, which integration produced this content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_called: Option<ToolCalled>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            timestamp: Utc::now(),
            content: content.into(),
            user: None,
            tools: None,
            tool_called: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn tool(content: impl Into<String>, called: ToolCalled) -> Self {
        let mut message = Self::new(Role::Tool, content);
        message.tool_called = Some(called);
        message
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_user(mut self, user: UserInfo) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_tools(mut self, tools: Vec<IntegrationRequest>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Closed set of message roles. Records decoded from the store map
/// unrecognized role strings to [`Role::User`] rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    pub fn from_lossy(role: &str) -> Self {
        match role {
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "tool" => Role::Tool,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub pronouns: String,
}

impl UserInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            pronouns: "unknown".into(),
        }
    }

    /// Sentinel identity used when a stored record carries no author.
    pub fn unknown() -> Self {
        Self::new("0", "unknown")
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_pronouns(mut self, pronouns: impl Into<String>) -> Self {
        self.pronouns = pronouns.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCalled {
    pub name: String,
    pub args: Value,
}

/// Role-tagged message shape handed to models. Produced from persisted
/// [`Message`]s by [`transform::transform`]; never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        call_id: String,
        name: String,
        args: Value,
        content: String,
    },
}

/// One tool a model may call, in provider-neutral form. Providers
/// reshape `parameters` (a JSON Schema object) into their own wire
/// format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool invocation proposed by a model. `id` is empty when the
/// provider did not assign one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// What a model returned for one invocation.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub response_metadata: Option<Value>,
    pub usage: Option<TokenUsage>,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// The stand-in reply for a failed model call.
    pub fn apology() -> Self {
        Self::text(APOLOGY_CONTENT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A conversational model endpoint. Implementations translate the
/// neutral message and tool shapes into their provider's wire format.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        tools: &[ToolSchema],
    ) -> Result<ModelReply, ModelError>;
}

/// Runs a model call under the configured deadline. Expiry surfaces as
/// [`ModelError::Timeout`] so callers degrade it like any other model
/// failure.
pub(crate) async fn invoke_bounded(
    model: &dyn ChatModel,
    messages: &[ModelMessage],
    tools: &[ToolSchema],
    limit: std::time::Duration,
) -> Result<ModelReply, ModelError> {
    match tokio::time::timeout(limit, model.invoke(messages, tools)).await {
        Ok(reply) => reply,
        Err(_) => Err(ModelError::Timeout),
    }
}
