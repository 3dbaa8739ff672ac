//! Session construction and model-role resolution.

use std::sync::Arc;

use switchboard_common::{new_id, ModelError};

use crate::history::History;
use crate::integrations::IntegrationRunner;
use crate::{ChatModel, Message};

use super::context::EngineContext;
use super::types::SessionOptions;

/// System instruction prefixed to the grounding phase context.
pub(super) const GROUNDING_INSTRUCTION: &str = "Answer the user's question using only the \
     integration results included in this conversation. Do not draw on outside knowledge. If the \
     results are not sufficient to answer, reply exactly: I'm sorry, but I can't answer that from \
     the information I have right now.";

/// Appended to the last input message id to form the assistant id.
pub(super) const REPLY_ID_SUFFIX: &str = "-reply";

/// A two-phase conversation session.
///
/// The caller model decides which integrations to run; the primary
/// model, or a distinct grounding model when one is configured,
/// produces the user-facing answer.
pub struct ChatSession {
    pub(super) context: Arc<EngineContext>,
    pub(super) options: SessionOptions,
    pub(super) history: History,
    pub(super) primary: Arc<dyn ChatModel>,
    pub(super) grounding: Arc<dyn ChatModel>,
    pub(super) runner: IntegrationRunner,
}

impl ChatSession {
    /// Resolve model handles for the session's roles. A partially
    /// configured grounding role borrows the missing half from the
    /// primary; a fully absent one reuses the primary handle.
    pub async fn new(
        context: Arc<EngineContext>,
        options: SessionOptions,
    ) -> Result<Self, ModelError> {
        let history = History::new(context.store(), options.conversation.clone());
        let primary = context.model(options.provider, &options.model).await?;
        let grounding = match (options.grounding_provider, options.grounding_model.as_deref()) {
            (None, None) => Arc::clone(&primary),
            (provider, model) => {
                let provider = provider.unwrap_or(options.provider);
                let model = model.unwrap_or(options.model.as_str());
                context.model(provider, model).await?
            }
        };
        let caller = context
            .model(options.caller_provider, &options.caller_model)
            .await?;
        let runner = IntegrationRunner::new(
            context.integrations(),
            caller,
            context.settings().model_timeout(),
        );

        Ok(Self {
            context,
            options,
            history,
            primary,
            grounding,
            runner,
        })
    }

    /// The conversation's history handle, for transcript and clear
    /// endpoints.
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }
}

/// Assistant message id for a turn: the last input message's id plus
/// the reply suffix, or a fresh id when the turn carried no usable id.
pub(super) fn reply_id(new_messages: &[Message]) -> String {
    match new_messages.last() {
        Some(message) if !message.id.is_empty() => format!("{}{REPLY_ID_SUFFIX}", message.id),
        _ => new_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_id_derives_from_last_input() {
        let messages = vec![
            Message::user("first").with_id("m-1"),
            Message::user("second").with_id("m-2"),
        ];
        assert_eq!(reply_id(&messages), "m-2-reply");
    }

    #[test]
    fn reply_id_is_fresh_without_a_usable_id() {
        let blank = vec![Message::user("hello").with_id("")];
        let id = reply_id(&blank);
        assert!(!id.ends_with(REPLY_ID_SUFFIX));
        assert_eq!(id.len(), 36);

        let none: Vec<Message> = Vec::new();
        assert_eq!(reply_id(&none).len(), 36);
    }

    #[test]
    fn grounding_instruction_carries_the_exact_apology() {
        assert!(GROUNDING_INSTRUCTION.contains(
            "I'm sorry, but I can't answer that from the information I have right now."
        ));
    }
}
