//! The `send` subcommand: one conversation turn.

use std::sync::Arc;

use switchboard_common::{new_id, ConversationId, Result};
use switchboard_engine::{DegradeCause, EngineContext, Message, TurnOutcome, UserInfo};

pub async fn run(
    context: &Arc<EngineContext>,
    conversation: &str,
    name: &str,
    pronouns: Option<&str>,
    text: &str,
) -> Result<()> {
    let session = context.session(ConversationId::new(conversation)).await?;

    let mut user = UserInfo::new(new_id(), name).with_display_name(name);
    if let Some(pronouns) = pronouns {
        user = user.with_pronouns(pronouns);
    }

    let outcome = session
        .send_message(Message::user(text).with_user(user))
        .await?;

    let degraded = match &outcome {
        TurnOutcome::Degraded(_, DegradeCause::Decision(err)) => {
            Some(format!("tool decision failed: {err}"))
        }
        TurnOutcome::Degraded(_, DegradeCause::Generation(err)) => {
            Some(format!("answer generation failed: {err}"))
        }
        TurnOutcome::Answered(_) => None,
    };

    let reply = outcome.reply();
    println!("{}", reply.content);

    if let Some(results) = &reply.task_results {
        println!();
        for result in results {
            println!("[{}] {}", result.status, result.integration.name);
        }
    }
    if let Some(usage) = reply.usage {
        println!();
        println!(
            "tokens: {} in / {} out / {} total",
            usage.input_tokens,
            usage.output_tokens,
            usage.total_tokens()
        );
    }
    if let Some(note) = degraded {
        eprintln!("note: {note}");
    }

    Ok(())
}
