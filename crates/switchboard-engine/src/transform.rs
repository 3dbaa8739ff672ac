//! Conversion from persisted history into model-facing messages.

use serde_json::Value;

use crate::{Message, ModelMessage, Role};

/// Map persisted messages onto the role-tagged shape models consume.
/// Total over the role set, order preserving, never drops a message.
pub fn transform(messages: &[Message]) -> Vec<ModelMessage> {
    messages.iter().map(to_model_message).collect()
}

fn to_model_message(message: &Message) -> ModelMessage {
    match message.role {
        Role::System => ModelMessage::System {
            content: message.content.clone(),
        },
        Role::User => ModelMessage::User {
            content: message.content.clone(),
        },
        Role::Assistant => ModelMessage::Assistant {
            content: message.content.clone(),
            tool_calls: message
                .tools
                .as_ref()
                .map(|tools| tools.iter().map(|t| t.as_tool_call()).collect())
                .unwrap_or_default(),
        },
        Role::Tool => {
            let (name, args) = match &message.tool_called {
                Some(called) => (called.name.clone(), called.args.clone()),
                None => (String::new(), Value::Null),
            };
            ModelMessage::Tool {
                call_id: message.id.clone(),
                name,
                args,
                content: message.content.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IntegrationRequest, ToolCalled};
    use serde_json::json;

    #[test]
    fn plain_roles_carry_content_through() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("hello"),
            Message::assistant("hi"),
        ];
        let out = transform(&messages);
        assert_eq!(
            out,
            vec![
                ModelMessage::System {
                    content: "be brief".into()
                },
                ModelMessage::User {
                    content: "hello".into()
                },
                ModelMessage::Assistant {
                    content: "hi".into(),
                    tool_calls: vec![],
                },
            ]
        );
    }

    #[test]
    fn assistant_tools_become_tool_calls() {
        let request = IntegrationRequest::new("current_weather", json!({"location": "Oslo"}))
            .with_id("call-1");
        let message = Message::assistant("checking").with_tools(vec![request]);

        let out = transform(std::slice::from_ref(&message));
        match &out[0] {
            ModelMessage::Assistant { tool_calls, .. } => {
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].id, "call-1");
                assert_eq!(tool_calls[0].name, "current_weather");
                assert_eq!(tool_calls[0].arguments, json!({"location": "Oslo"}));
            }
            other => panic!("expected assistant, got {other:?}"),
        }
    }

    #[test]
    fn tool_messages_keep_their_provenance() {
        let message = Message::tool(
            "12 degrees and raining",
            ToolCalled {
                name: "current_weather".into(),
                args: json!({"location": "Bergen"}),
            },
        )
        .with_id("call-9");

        let out = transform(std::slice::from_ref(&message));
        assert_eq!(
            out[0],
            ModelMessage::Tool {
                call_id: "call-9".into(),
                name: "current_weather".into(),
                args: json!({"location": "Bergen"}),
                content: "12 degrees and raining".into(),
            }
        );
    }

    #[test]
    fn tool_message_without_provenance_still_transforms() {
        let mut message = Message::user("orphan result").with_id("call-2");
        message.role = Role::Tool;

        let out = transform(std::slice::from_ref(&message));
        assert_eq!(
            out[0],
            ModelMessage::Tool {
                call_id: "call-2".into(),
                name: String::new(),
                args: Value::Null,
                content: "orphan result".into(),
            }
        );
    }

    #[test]
    fn output_length_matches_input() {
        let messages: Vec<Message> = (0..5).map(|i| Message::user(format!("m{i}"))).collect();
        assert_eq!(transform(&messages).len(), messages.len());
    }
}
