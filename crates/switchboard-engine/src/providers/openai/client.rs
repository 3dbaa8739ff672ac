//! Chat completions request building and response parsing.

use serde_json::{json, Value};

use switchboard_common::ModelError;

use crate::{ModelMessage, ModelReply, TokenUsage, ToolCall, ToolSchema};

use super::config::OpenAiConfig;

pub struct OpenAiChatModel {
    pub(crate) config: OpenAiConfig,
    pub(crate) http: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    pub(crate) fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Build the JSON request body for the chat completions API.
    pub(crate) fn build_request_body(
        &self,
        messages: &[ModelMessage],
        tools: &[ToolSchema],
    ) -> Value {
        let mut msgs = Vec::new();
        for message in messages {
            msgs.push(match message {
                ModelMessage::System { content } => json!({
                    "role": "system",
                    "content": content,
                }),
                ModelMessage::User { content } => json!({
                    "role": "user",
                    "content": content,
                }),
                ModelMessage::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut msg = json!({
                        "role": "assistant",
                        "content": content,
                    });
                    if !tool_calls.is_empty() {
                        let calls: Vec<Value> = tool_calls
                            .iter()
                            .map(|call| {
                                json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        // Arguments travel as a JSON string
                                        // on this API.
                                        "arguments": call.arguments.to_string(),
                                    },
                                })
                            })
                            .collect();
                        msg["tool_calls"] = Value::Array(calls);
                    }
                    msg
                }
                ModelMessage::Tool {
                    call_id, content, ..
                } => json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": content,
                }),
            });
        }

        let mut body = json!({
            "model": self.config.model,
            "messages": msgs,
        });

        if !tools.is_empty() {
            let defs: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        },
                    })
                })
                .collect();
            body["tools"] = Value::Array(defs);
            body["tool_choice"] = json!("auto");
            // One decision per call keeps the run phase sequential.
            body["parallel_tool_calls"] = json!(false);
        }

        body
    }

    /// Parse a chat completions response.
    pub(crate) fn parse_response(&self, json: Value) -> Result<ModelReply, ModelError> {
        let message = &json["choices"][0]["message"];
        if message.is_null() {
            return Err(ModelError::Parse("response has no choices".into()));
        }

        let content = message["content"].as_str().unwrap_or_default().to_string();

        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| ToolCall {
                        id: call["id"].as_str().unwrap_or("").to_string(),
                        name: call["function"]["name"].as_str().unwrap_or("").to_string(),
                        arguments: parse_arguments(&call["function"]["arguments"]),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = json.get("usage").filter(|u| !u.is_null()).map(|u| TokenUsage {
            input_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
            output_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        });

        let response_metadata = Some(json!({
            "model": json["model"],
            "finishReason": json["choices"][0]["finish_reason"],
        }));

        Ok(ModelReply {
            content,
            tool_calls,
            response_metadata,
            usage,
        })
    }
}

/// Tool-call arguments arrive as a JSON string; anything unparseable
/// degrades to an empty object.
fn parse_arguments(value: &Value) -> Value {
    match value.as_str() {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| json!({})),
        None => value.clone(),
    }
}
