//! ChatModel implementation for OllamaChatModel.

use async_trait::async_trait;
use tracing::debug;

use switchboard_common::ModelError;

use crate::{ChatModel, ModelMessage, ModelReply, ToolSchema};

use super::client::OllamaChatModel;

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        tools: &[ToolSchema],
    ) -> Result<ModelReply, ModelError> {
        let body = self.build_request_body(messages, tools);

        debug!(model = %self.config.model, tools = tools.len(), "ollama chat request");

        let response = self
            .http
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(ModelError::Api(format!("HTTP {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ModelError::Parse(e.to_string()))?;

        self.parse_response(json)
    }
}
