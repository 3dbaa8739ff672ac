//! Current date and time integration.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::integrations::{HandlerError, HandlerReply, Integration, IntegrationHandler};

pub fn current_datetime() -> Integration {
    Integration::new(
        "current_datetime",
        "Get the current date and time in UTC. Takes no arguments.",
        Arc::new(DateTimeHandler),
    )
}

struct DateTimeHandler;

#[async_trait]
impl IntegrationHandler for DateTimeHandler {
    async fn call(&self, _args: &Value) -> Result<HandlerReply, HandlerError> {
        Ok(reply_for(Utc::now()))
    }
}

fn reply_for(now: DateTime<Utc>) -> HandlerReply {
    let content = format!(
        "It is currently {} UTC.",
        now.format("%A, %-d %B %Y, %H:%M:%S")
    );
    HandlerReply::completed(content).with_metadata(serde_json::json!({
        "iso8601": now.to_rfc3339(),
        "unixTimestamp": now.timestamp(),
        "weekday": now.format("%A").to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::IntegrationStatus;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn reply_is_human_readable_with_machine_metadata() {
        let moment = Utc.with_ymd_and_hms(2026, 8, 23, 9, 5, 7).unwrap();
        let reply = reply_for(moment);

        assert_eq!(reply.status, IntegrationStatus::Completed);
        assert_eq!(reply.content, "It is currently Sunday, 23 August 2026, 09:05:07 UTC.");
        let metadata = reply.metadata.unwrap();
        assert_eq!(metadata["iso8601"], json!("2026-08-23T09:05:07+00:00"));
        assert_eq!(metadata["unixTimestamp"], json!(1787475907));
        assert_eq!(metadata["weekday"], json!("Sunday"));
    }

    #[test]
    fn schema_takes_no_arguments() {
        let integration = current_datetime();
        let schema = integration.schema_json();
        assert_eq!(schema["required"], json!([]));
        assert_eq!(schema["properties"], json!({}));
    }

    #[tokio::test]
    async fn handler_always_completes() {
        let reply = DateTimeHandler.call(&json!({})).await.unwrap();
        assert_eq!(reply.status, IntegrationStatus::Completed);
        assert!(reply.content.starts_with("It is currently "));
    }
}
