//! The `clear` subcommand: delete a conversation.

use std::sync::Arc;

use switchboard_common::{ConversationId, Result};
use switchboard_engine::{EngineContext, History};

pub async fn run(context: &Arc<EngineContext>, conversation: &str) -> Result<()> {
    let history = History::new(context.store(), ConversationId::new(conversation));
    let deleted = history.clear().await?;
    println!("deleted {deleted} message(s) from {conversation}");
    Ok(())
}
