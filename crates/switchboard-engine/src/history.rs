//! Durable message history for one conversation.
//!
//! Each message is stored as its own record under the key
//! `<conversation>:<message id>`, so appends never rewrite existing
//! records and two writers can extend the same conversation without
//! clobbering each other. Reads sort by timestamp, not key order.
//!
//! Decoding is lossy by contract: a malformed record yields a message
//! with defaulted fields rather than an error, so one corrupt record
//! cannot take down an entire conversation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use switchboard_common::{ConversationId, StoreError};

use crate::integrations::IntegrationRequest;
use crate::store::ByteStore;
use crate::{Message, Role, ToolCalled, UserInfo};

pub struct History {
    store: Arc<dyn ByteStore>,
    conversation: ConversationId,
}

impl History {
    pub fn new(store: Arc<dyn ByteStore>, conversation: ConversationId) -> Self {
        Self {
            store,
            conversation,
        }
    }

    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    fn prefix(&self) -> String {
        format!("{}:", self.conversation)
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{}", self.conversation, id)
    }

    /// Resolve message ids to messages, sorted by timestamp ascending.
    /// Ids with no stored record are skipped; present records always
    /// decode (lossily). Equal timestamps keep their input order.
    pub async fn get(&self, ids: &[String]) -> Result<Vec<Message>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(|id| self.key(id)).collect();
        let records = self.store.mget(&keys).await?;
        let mut messages: Vec<Message> = records
            .iter()
            .flatten()
            .map(|bytes| decode_record(bytes))
            .collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(messages)
    }

    /// The full conversation, sorted by timestamp ascending.
    pub async fn get_all(&self) -> Result<Vec<Message>, StoreError> {
        let prefix = self.prefix();
        let ids: Vec<String> = self
            .store
            .list_keys(&prefix)
            .await?
            .into_iter()
            .map(|key| key[prefix.len()..].to_string())
            .collect();
        self.get(&ids).await
    }

    /// Every storage key belonging to this conversation.
    pub async fn all_keys(&self) -> Result<Vec<String>, StoreError> {
        self.store.list_keys(&self.prefix()).await
    }

    /// Persist messages, keyed by their ids. Re-adding an id overwrites
    /// that record.
    pub async fn add(&self, messages: &[Message]) -> Result<(), StoreError> {
        let mut pairs = Vec::with_capacity(messages.len());
        for message in messages {
            pairs.push((self.key(&message.id), serde_json::to_vec(message)?));
        }
        self.store.mset(pairs).await
    }

    /// Remove every stored message for this conversation. Returns how
    /// many records were deleted.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let keys = self.all_keys().await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.store.mdelete(&keys).await?;
        Ok(keys.len())
    }
}

/// Permissive mirror of the stored message shape. Every field is
/// optional so partial records still deserialize.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMessage {
    id: Option<String>,
    role: Option<String>,
    timestamp: Option<String>,
    content: Option<String>,
    user: Option<RawUser>,
    tools: Option<Vec<IntegrationRequest>>,
    tool_called: Option<ToolCalled>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawUser {
    id: Option<String>,
    name: Option<String>,
    display_name: Option<String>,
    pronouns: Option<String>,
}

fn decode_record(bytes: &[u8]) -> Message {
    let raw: RawMessage = serde_json::from_slice(bytes).unwrap_or_default();
    let user = raw.user.unwrap_or_default();
    // Display name falls back to the raw name, before defaulting, so a
    // record with neither stays without one.
    let display_name = user.display_name.or_else(|| user.name.clone());
    Message {
        id: non_empty(raw.id, "0"),
        role: Role::from_lossy(raw.role.as_deref().unwrap_or_default()),
        timestamp: raw
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
        content: non_empty(raw.content, "[empty]"),
        user: Some(UserInfo {
            id: non_empty(user.id, "0"),
            name: non_empty(user.name, "unknown"),
            display_name,
            pronouns: non_empty(user.pronouns, "unknown"),
        }),
        tools: raw.tools,
        tool_called: raw.tool_called,
    }
}

fn non_empty(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
