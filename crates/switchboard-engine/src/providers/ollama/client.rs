//! Ollama /api/chat request building and response parsing.

use serde_json::{json, Value};

use switchboard_common::ModelError;

use crate::{ModelMessage, ModelReply, TokenUsage, ToolCall, ToolSchema};

use super::config::OllamaConfig;

pub struct OllamaChatModel {
    pub(crate) config: OllamaConfig,
    pub(crate) http: reqwest::Client,
}

impl OllamaChatModel {
    pub fn new(config: OllamaConfig) -> Self {
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
        format!("{}/api/chat", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the JSON request body for /api/chat. Responses are always
    /// requested unstreamed.
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
                                    "function": {
                                        "name": call.name,
                                        // Ollama keeps arguments as an
                                        // object, unlike OpenAI.
                                        "arguments": call.arguments,
                                    },
                                })
                            })
                            .collect();
                        msg["tool_calls"] = Value::Array(calls);
                    }
                    msg
                }
                ModelMessage::Tool { content, .. } => json!({
                    "role": "tool",
                    "content": content,
                }),
            });
        }

        let mut body = json!({
            "model": self.config.model,
            "messages": msgs,
            "stream": false,
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
        }

        body
    }

    /// Parse an /api/chat response.
    pub(crate) fn parse_response(&self, json: Value) -> Result<ModelReply, ModelError> {
        let message = &json["message"];
        if message.is_null() {
            return Err(ModelError::Parse("response has no message".into()));
        }

        let content = message["content"].as_str().unwrap_or_default().to_string();

        // Ollama does not assign call ids; the decision phase mints
        // them where needed.
        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| ToolCall {
                        id: call["id"].as_str().unwrap_or("").to_string(),
                        name: call["function"]["name"].as_str().unwrap_or("").to_string(),
                        arguments: call["function"]["arguments"].clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = if json.get("prompt_eval_count").is_some() || json.get("eval_count").is_some()
        {
            Some(TokenUsage {
                input_tokens: json["prompt_eval_count"].as_u64().unwrap_or(0),
                output_tokens: json["eval_count"].as_u64().unwrap_or(0),
            })
        } else {
            None
        };

        let response_metadata = Some(json!({
            "model": json["model"],
            "doneReason": json["done_reason"],
        }));

        Ok(ModelReply {
            content,
            tool_calls,
            response_metadata,
            usage,
        })
    }
}
