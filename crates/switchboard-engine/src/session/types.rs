//! Session option and outcome types.

use serde_json::Value;

use switchboard_common::{ConversationId, ModelError};

use crate::integrations::IntegrationResult;
use crate::providers::ProviderKind;
use crate::TokenUsage;

/// Which models serve one conversation, by role.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub conversation: ConversationId,
    /// Answers the user.
    pub provider: ProviderKind,
    pub model: String,
    /// Decides which integrations to invoke.
    pub caller_provider: ProviderKind,
    pub caller_model: String,
    /// Answers from integration results. Falls back to the primary
    /// model when unset.
    pub grounding_provider: Option<ProviderKind>,
    pub grounding_model: Option<String>,
}

/// The assistant's reply for one turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub content: String,
    /// Results of the integrations run this turn, in invocation order.
    /// `None` on the direct path.
    pub task_results: Option<Vec<IntegrationResult>>,
    pub response_metadata: Option<Value>,
    pub usage: Option<TokenUsage>,
}

/// Which phase of a turn fell back to the apology path.
#[derive(Debug)]
pub enum DegradeCause {
    /// The caller model failed; the turn proceeded with zero tasks.
    Decision(ModelError),
    /// The answering model failed; the content is the fixed apology.
    Generation(ModelError),
}

/// How a turn concluded. A degraded turn still carries a usable reply.
#[derive(Debug)]
pub enum TurnOutcome {
    Answered(TurnReply),
    Degraded(TurnReply, DegradeCause),
}

impl TurnOutcome {
    /// The reply, whichever way the turn went.
    pub fn reply(&self) -> &TurnReply {
        match self {
            TurnOutcome::Answered(reply) => reply,
            TurnOutcome::Degraded(reply, _) => reply,
        }
    }

    pub fn into_reply(self) -> TurnReply {
        match self {
            TurnOutcome::Answered(reply) => reply,
            TurnOutcome::Degraded(reply, _) => reply,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, TurnOutcome::Degraded(..))
    }

    /// Token usage reported by whichever model answered.
    pub fn usage(&self) -> Option<TokenUsage> {
        self.reply().usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(content: &str) -> TurnReply {
        TurnReply {
            content: content.to_string(),
            task_results: None,
            response_metadata: None,
            usage: None,
        }
    }

    #[test]
    fn outcome_exposes_reply_on_both_paths() {
        let answered = TurnOutcome::Answered(reply("hi"));
        assert_eq!(answered.reply().content, "hi");
        assert!(!answered.is_degraded());

        let degraded = TurnOutcome::Degraded(
            reply("sorry"),
            DegradeCause::Generation(ModelError::RateLimited),
        );
        assert_eq!(degraded.reply().content, "sorry");
        assert!(degraded.is_degraded());
        assert_eq!(degraded.into_reply().content, "sorry");
    }

    #[test]
    fn usage_comes_from_the_reply() {
        let mut turn = reply("hi");
        turn.usage = Some(TokenUsage {
            input_tokens: 3,
            output_tokens: 5,
        });
        let outcome = TurnOutcome::Answered(turn);
        assert_eq!(outcome.usage().map(|u| u.total_tokens()), Some(8));
    }
}
