//! The send pipeline: load, persist, decide, run, ground, persist.

use serde_json::Value;
use tracing::{debug, warn};

use switchboard_common::{ModelError, Result};

use crate::integrations::{Decision, IntegrationResult};
use crate::transform::transform;
use crate::{invoke_bounded, ChatModel, Message, ModelMessage, ModelReply};

use super::manager::{reply_id, ChatSession, GROUNDING_INSTRUCTION};
use super::types::{DegradeCause, TurnOutcome, TurnReply};

impl ChatSession {
    /// Run one turn over the new messages.
    ///
    /// The input is persisted before any model is consulted. Model
    /// failures in either phase degrade the reply to the fixed apology
    /// content rather than erroring; store failures propagate.
    pub async fn send(&self, new_messages: Vec<Message>) -> Result<TurnOutcome> {
        let mut context = self.history.get_all().await?;
        self.history.add(&new_messages).await?;

        let assistant_id = reply_id(&new_messages);
        context.extend(new_messages);

        let decision = self.runner.decide(&context).await;
        debug!(
            conversation = %self.options.conversation,
            tasks = decision.tasks.len(),
            "decision phase complete"
        );

        if decision.tasks.is_empty() {
            self.direct_answer(&context, assistant_id, decision).await
        } else {
            self.grounded_answer(&context, assistant_id, decision).await
        }
    }

    /// One-message convenience over [`Self::send`].
    pub async fn send_message(&self, message: Message) -> Result<TurnOutcome> {
        self.send(vec![message]).await
    }

    /// Answer from history alone, with no tool schemas bound and no
    /// grounding instruction.
    async fn direct_answer(
        &self,
        context: &[Message],
        assistant_id: String,
        decision: Decision,
    ) -> Result<TurnOutcome> {
        let transformed = transform(context);
        let (reply, failure) = self.generate(self.primary.as_ref(), &transformed).await;

        let assistant = Message::assistant(reply.content.clone()).with_id(assistant_id);
        self.history.add(std::slice::from_ref(&assistant)).await?;

        let turn = TurnReply {
            content: reply.content,
            task_results: None,
            response_metadata: reply.response_metadata,
            usage: reply.usage,
        };
        Ok(outcome(turn, decision.degraded, failure))
    }

    /// Run the decided tasks, then answer from their results under the
    /// grounding instruction.
    async fn grounded_answer(
        &self,
        context: &[Message],
        assistant_id: String,
        decision: Decision,
    ) -> Result<TurnOutcome> {
        let results = self.runner.run(&decision.tasks).await;

        let mut transformed = Vec::with_capacity(context.len() + results.len() + 2);
        transformed.push(ModelMessage::System {
            content: GROUNDING_INSTRUCTION.to_string(),
        });
        transformed.extend(transform(context));
        transformed.push(ModelMessage::Assistant {
            content: String::new(),
            tool_calls: decision.tasks.iter().map(|task| task.as_tool_call()).collect(),
        });
        transformed.extend(results.iter().map(tool_result_message));

        let (reply, failure) = self.generate(self.grounding.as_ref(), &transformed).await;

        let assistant = Message::assistant(reply.content.clone())
            .with_id(assistant_id)
            .with_tools(decision.tasks);
        self.history.add(std::slice::from_ref(&assistant)).await?;

        let turn = TurnReply {
            content: reply.content,
            task_results: Some(results),
            response_metadata: reply.response_metadata,
            usage: reply.usage,
        };
        Ok(outcome(turn, decision.degraded, failure))
    }

    /// Invoke the answering model with no tools bound, swallowing any
    /// failure into the apology reply.
    async fn generate(
        &self,
        model: &dyn ChatModel,
        messages: &[ModelMessage],
    ) -> (ModelReply, Option<ModelError>) {
        let limit = self.context.settings().model_timeout();
        match invoke_bounded(model, messages, &[], limit).await {
            Ok(reply) => (reply, None),
            Err(err) => {
                warn!(error = %err, "generation failed, substituting apology");
                (ModelReply::apology(), Some(err))
            }
        }
    }
}

fn tool_result_message(result: &IntegrationResult) -> ModelMessage {
    ModelMessage::Tool {
        call_id: result.integration.id.clone(),
        name: result.integration.name.clone(),
        args: result
            .integration
            .passed_arguments
            .clone()
            .unwrap_or(Value::Null),
        content: result.content.clone(),
    }
}

/// A generation failure outranks a decision failure as the recorded
/// cause.
fn outcome(
    turn: TurnReply,
    decision_failure: Option<ModelError>,
    generation_failure: Option<ModelError>,
) -> TurnOutcome {
    if let Some(err) = generation_failure {
        return TurnOutcome::Degraded(turn, DegradeCause::Generation(err));
    }
    if let Some(err) = decision_failure {
        return TurnOutcome::Degraded(turn, DegradeCause::Decision(err));
    }
    TurnOutcome::Answered(turn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::integrations::{IntegrationInfo, IntegrationStatus};

    fn turn() -> TurnReply {
        TurnReply {
            content: "fine".into(),
            task_results: None,
            response_metadata: None,
            usage: None,
        }
    }

    #[test]
    fn outcome_prefers_generation_cause() {
        let out = outcome(
            turn(),
            Some(ModelError::RateLimited),
            Some(ModelError::Timeout),
        );
        assert!(matches!(
            out,
            TurnOutcome::Degraded(_, DegradeCause::Generation(ModelError::Timeout))
        ));
    }

    #[test]
    fn outcome_reports_decision_cause_alone() {
        let out = outcome(turn(), Some(ModelError::RateLimited), None);
        assert!(matches!(
            out,
            TurnOutcome::Degraded(_, DegradeCause::Decision(ModelError::RateLimited))
        ));

        let out = outcome(turn(), None, None);
        assert!(matches!(out, TurnOutcome::Answered(_)));
    }

    #[test]
    fn tool_result_message_carries_provenance() {
        let result = IntegrationResult {
            status: IntegrationStatus::Completed,
            content: "22 degrees".into(),
            attachments: None,
            metadata: None,
            timestamp: Utc::now(),
            integration: IntegrationInfo {
                id: "call-7".into(),
                name: "current_weather".into(),
                description: "weather".into(),
                arguments: Value::Null,
                passed_arguments: Some(serde_json::json!({"location": "Oslo"})),
            },
        };

        match tool_result_message(&result) {
            ModelMessage::Tool {
                call_id,
                name,
                args,
                content,
            } => {
                assert_eq!(call_id, "call-7");
                assert_eq!(name, "current_weather");
                assert_eq!(args["location"], "Oslo");
                assert_eq!(content, "22 degrees");
            }
            other => panic!("expected tool message, got {other:?}"),
        }
    }
}
