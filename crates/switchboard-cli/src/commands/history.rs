//! The `history` subcommand: print a conversation's transcript.

use std::sync::Arc;

use switchboard_common::{ConversationId, Result};
use switchboard_engine::{EngineContext, History, Role};

pub async fn run(context: &Arc<EngineContext>, conversation: &str) -> Result<()> {
    let history = History::new(context.store(), ConversationId::new(conversation));
    let messages = history.get_all().await?;

    if messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for message in messages {
        let author = message
            .user
            .as_ref()
            .and_then(|u| u.display_name.as_deref())
            .unwrap_or(role_label(message.role));
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%Y-%m-%d %H:%M:%S"),
            author,
            message.content
        );
    }

    Ok(())
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::Tool => "tool",
    }
}
