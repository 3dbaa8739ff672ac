//! Sequential integration invocation plus the tool decision phase.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use switchboard_common::{new_id, ModelError};

use crate::integrations::{
    IntegrationInfo, IntegrationRequest, IntegrationResult, IntegrationSet, IntegrationStatus,
};
use crate::transform::transform;
use crate::{invoke_bounded, ChatModel, Message, ModelReply};

/// Provenance placeholder for requests naming no known integration.
const UNKNOWN: &str = "unknown";
/// Result content for requests naming no known integration.
const NOT_FOUND_CONTENT: &str = "Integration not found";

/// Invokes integration requests and asks the caller model which ones a
/// turn needs.
pub struct IntegrationRunner {
    set: Arc<IntegrationSet>,
    caller: Arc<dyn ChatModel>,
    call_timeout: Duration,
}

/// What the decision phase concluded for one turn.
pub struct Decision {
    /// The caller model's raw reply, or the apology stand-in when the
    /// call failed.
    pub completion: ModelReply,
    /// Deduplicated integration requests, in proposal order.
    pub tasks: Vec<IntegrationRequest>,
    /// Set when the caller model failed and the decision degraded to
    /// zero tasks.
    pub degraded: Option<ModelError>,
}

impl IntegrationRunner {
    pub fn new(
        set: Arc<IntegrationSet>,
        caller: Arc<dyn ChatModel>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            set,
            caller,
            call_timeout,
        }
    }

    /// Invoke requests one at a time, in order. Every request yields a
    /// result; a failing call never aborts its siblings.
    pub async fn run(&self, requests: &[IntegrationRequest]) -> Vec<IntegrationResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.invoke_call(request).await);
        }
        results
    }

    /// Invoke a single request. Unknown names and handler errors both
    /// come back as `fatal` results, terminal for this call only.
    pub async fn invoke_call(&self, request: &IntegrationRequest) -> IntegrationResult {
        let Some(integration) = self.set.get(&request.name) else {
            warn!(name = %request.name, "integration not found");
            return IntegrationResult {
                status: IntegrationStatus::Fatal,
                content: NOT_FOUND_CONTENT.to_string(),
                attachments: None,
                metadata: Some(serde_json::json!({
                    "name": request.name,
                    "args": request.args,
                })),
                timestamp: Utc::now(),
                integration: IntegrationInfo {
                    id: request.id.clone(),
                    name: UNKNOWN.to_string(),
                    description: UNKNOWN.to_string(),
                    arguments: Value::Null,
                    passed_arguments: Some(request.args.clone()),
                },
            };
        };

        debug!(name = %request.name, id = %request.id, "invoking integration");
        let info = IntegrationInfo {
            id: request.id.clone(),
            name: integration.name().to_string(),
            description: integration.description().to_string(),
            arguments: integration.schema_json(),
            passed_arguments: Some(request.args.clone()),
        };

        match integration.handler().call(&request.args).await {
            Ok(reply) => IntegrationResult {
                status: reply.status,
                content: reply.content,
                attachments: reply.attachments,
                metadata: reply.metadata,
                timestamp: Utc::now(),
                integration: info,
            },
            Err(err) => {
                warn!(name = %request.name, error = %err, "integration call failed");
                IntegrationResult {
                    status: IntegrationStatus::Fatal,
                    content: err.to_string(),
                    attachments: None,
                    metadata: None,
                    timestamp: Utc::now(),
                    integration: info,
                }
            }
        }
    }

    /// Ask the caller model which integrations this turn needs, with
    /// the full schema set bound. A model failure degrades to zero
    /// tasks plus the apology reply; it never propagates.
    ///
    /// Duplicate names collapse to the first proposal. Requests naming
    /// unknown integrations pass through; [`Self::run`] reports those
    /// as fatal rather than silently dropping them.
    pub async fn decide(&self, history: &[Message]) -> Decision {
        let context = transform(history);
        let schemas = self.set.schemas();
        let (completion, degraded) =
            match invoke_bounded(self.caller.as_ref(), &context, &schemas, self.call_timeout).await
            {
                Ok(reply) => (reply, None),
                Err(err) => {
                    warn!(error = %err, "tool decision call failed");
                    (ModelReply::apology(), Some(err))
                }
            };

        let mut seen = HashSet::new();
        let tasks = completion
            .tool_calls
            .iter()
            .filter(|call| seen.insert(call.name.clone()))
            .map(|call| {
                let id = if call.id.is_empty() {
                    new_id()
                } else {
                    call.id.clone()
                };
                IntegrationRequest::new(call.name.clone(), call.arguments.clone()).with_id(id)
            })
            .collect();

        Decision {
            completion,
            tasks,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::{HandlerError, HandlerReply, Integration, IntegrationHandler};
    use crate::{ModelMessage, ToolCall, ToolSchema, APOLOGY_CONTENT};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct OkHandler;

    #[async_trait]
    impl IntegrationHandler for OkHandler {
        async fn call(&self, args: &Value) -> Result<HandlerReply, HandlerError> {
            Ok(HandlerReply::completed(format!("done: {args}")))
        }
    }

    struct BoomHandler;

    #[async_trait]
    impl IntegrationHandler for BoomHandler {
        async fn call(&self, _args: &Value) -> Result<HandlerReply, HandlerError> {
            Err(HandlerError::Other("boom".into()))
        }
    }

    struct ScriptedCaller {
        reply: Mutex<Option<Result<ModelReply, ModelError>>>,
        tools_seen: AtomicUsize,
    }

    impl ScriptedCaller {
        fn new(reply: Result<ModelReply, ModelError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                tools_seen: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedCaller {
        async fn invoke(
            &self,
            _messages: &[ModelMessage],
            tools: &[ToolSchema],
        ) -> Result<ModelReply, ModelError> {
            self.tools_seen.store(tools.len(), Ordering::SeqCst);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(ModelReply::text("unscripted")))
        }
    }

    struct SleepyCaller;

    #[async_trait]
    impl ChatModel for SleepyCaller {
        async fn invoke(
            &self,
            _messages: &[ModelMessage],
            _tools: &[ToolSchema],
        ) -> Result<ModelReply, ModelError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(ModelReply::text("too late"))
        }
    }

    fn set_with(integrations: Vec<Integration>) -> Arc<IntegrationSet> {
        Arc::new(IntegrationSet::new(integrations))
    }

    fn runner_with(set: Arc<IntegrationSet>, caller: Arc<dyn ChatModel>) -> IntegrationRunner {
        IntegrationRunner::new(set, caller, Duration::from_secs(5))
    }

    fn reply_with_calls(calls: Vec<ToolCall>) -> ModelReply {
        ModelReply {
            tool_calls: calls,
            ..ModelReply::default()
        }
    }

    #[tokio::test]
    async fn run_preserves_order_and_isolates_failures() {
        let set = set_with(vec![
            Integration::new("boom", "always fails", Arc::new(BoomHandler)),
            Integration::new("echo", "echoes args", Arc::new(OkHandler)),
        ]);
        let runner = runner_with(set, ScriptedCaller::new(Ok(ModelReply::default())));

        let requests = vec![
            IntegrationRequest::new("boom", json!({})).with_id("c1"),
            IntegrationRequest::new("echo", json!({"q": "x"})).with_id("c2"),
        ];
        let results = runner.run(&requests).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, IntegrationStatus::Fatal);
        assert_eq!(results[0].content, "boom");
        assert_eq!(results[1].status, IntegrationStatus::Completed);
        assert_eq!(results[1].integration.id, "c2");
    }

    #[tokio::test]
    async fn unknown_integration_yields_fatal_not_found() {
        let set = set_with(vec![]);
        let runner = runner_with(set, ScriptedCaller::new(Ok(ModelReply::default())));

        let request = IntegrationRequest::new("ghost", json!({"a": 1})).with_id("c1");
        let result = runner.invoke_call(&request).await;

        assert_eq!(result.status, IntegrationStatus::Fatal);
        assert_eq!(result.content, "Integration not found");
        assert_eq!(
            result.metadata,
            Some(json!({"name": "ghost", "args": {"a": 1}}))
        );
        assert_eq!(result.integration.name, "unknown");
        assert_eq!(result.integration.passed_arguments, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn completed_result_carries_schema_provenance() {
        let set = set_with(vec![Integration::new(
            "echo",
            "echoes args",
            Arc::new(OkHandler),
        )
        .with_argument("q", "The query", true)]);
        let runner = runner_with(set, ScriptedCaller::new(Ok(ModelReply::default())));

        let request = IntegrationRequest::new("echo", json!({"q": "x"})).with_id("c1");
        let result = runner.invoke_call(&request).await;

        assert_eq!(result.status, IntegrationStatus::Completed);
        assert_eq!(result.integration.name, "echo");
        assert_eq!(result.integration.description, "echoes args");
        assert_eq!(result.integration.arguments["required"], json!(["q"]));
        assert_eq!(result.integration.passed_arguments, Some(json!({"q": "x"})));
    }

    #[tokio::test]
    async fn decide_binds_every_schema() {
        let set = set_with(vec![
            Integration::new("one", "first", Arc::new(OkHandler)),
            Integration::new("two", "second", Arc::new(OkHandler)),
        ]);
        let caller = ScriptedCaller::new(Ok(ModelReply::default()));
        let runner = runner_with(set, caller.clone());

        let decision = runner.decide(&[Message::user("hi")]).await;
        assert!(decision.tasks.is_empty());
        assert!(decision.degraded.is_none());
        assert_eq!(caller.tools_seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn decide_dedups_names_first_wins() {
        let set = set_with(vec![Integration::new("echo", "e", Arc::new(OkHandler))]);
        let caller = ScriptedCaller::new(Ok(reply_with_calls(vec![
            ToolCall {
                id: "c1".into(),
                name: "echo".into(),
                arguments: json!({"n": 1}),
            },
            ToolCall {
                id: "c2".into(),
                name: "echo".into(),
                arguments: json!({"n": 2}),
            },
            ToolCall {
                id: "c3".into(),
                name: "other".into(),
                arguments: json!({}),
            },
        ])));
        let runner = runner_with(set, caller);

        let decision = runner.decide(&[Message::user("hi")]).await;
        assert_eq!(decision.tasks.len(), 2);
        assert_eq!(decision.tasks[0].name, "echo");
        assert_eq!(decision.tasks[0].args, json!({"n": 1}));
        // Unknown names pass through for the run phase to report.
        assert_eq!(decision.tasks[1].name, "other");
    }

    #[tokio::test]
    async fn decide_assigns_ids_where_the_model_left_none() {
        let set = set_with(vec![Integration::new("echo", "e", Arc::new(OkHandler))]);
        let caller = ScriptedCaller::new(Ok(reply_with_calls(vec![ToolCall {
            id: String::new(),
            name: "echo".into(),
            arguments: json!({}),
        }])));
        let runner = runner_with(set, caller);

        let decision = runner.decide(&[Message::user("hi")]).await;
        assert!(!decision.tasks[0].id.is_empty());
    }

    #[tokio::test]
    async fn decide_degrades_on_model_error() {
        let set = set_with(vec![Integration::new("echo", "e", Arc::new(OkHandler))]);
        let caller = ScriptedCaller::new(Err(ModelError::Api("HTTP 500".into())));
        let runner = runner_with(set, caller);

        let decision = runner.decide(&[Message::user("hi")]).await;
        assert!(decision.tasks.is_empty());
        assert_eq!(decision.completion.content, APOLOGY_CONTENT);
        assert!(matches!(decision.degraded, Some(ModelError::Api(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn decide_times_out_slow_models() {
        let set = set_with(vec![]);
        let runner = IntegrationRunner::new(set, Arc::new(SleepyCaller), Duration::from_secs(1));

        let decision = runner.decide(&[Message::user("hi")]).await;
        assert!(matches!(decision.degraded, Some(ModelError::Timeout)));
        assert_eq!(decision.completion.content, APOLOGY_CONTENT);
    }
}
