use serde::{Deserialize, Serialize};
use std::fmt;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Namespace for one conversation's stored messages. Storage keys are
/// built as `<conversation>:<message id>`, so the id itself must not
/// contain the `:` separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().replace(':', "-"))
    }

    pub fn random() -> Self {
        Self(new_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn new_id_is_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }

    #[test]
    fn conversation_id_random() {
        let id = ConversationId::random();
        let parsed = uuid::Uuid::parse_str(id.as_str());
        assert!(parsed.is_ok());
    }

    #[test]
    fn conversation_id_display() {
        let id = ConversationId::new("weekly-sync");
        assert_eq!(id.to_string(), "weekly-sync");
        assert_eq!(id.as_str(), "weekly-sync");
    }

    #[test]
    fn conversation_id_strips_separator() {
        let id = ConversationId::new("team:alpha");
        assert_eq!(id.as_str(), "team-alpha");
    }

    #[test]
    fn conversation_id_equality() {
        let a = ConversationId::new("one");
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, ConversationId::new("two"));
    }

    #[test]
    fn conversation_id_serialization() {
        let id = ConversationId::new("roundtrip");
        let json = serde_json::to_string(&id).unwrap();
        let back: ConversationId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
