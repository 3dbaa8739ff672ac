use clap::{Parser, Subcommand};

/// Switchboard: conversational orchestration over tool-calling models.
#[derive(Parser, Debug)]
#[command(name = "switchboard", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (e.g. debug, switchboard=debug).
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message and print the reply.
    Send {
        /// Conversation to speak in.
        #[arg(short, long)]
        conversation: String,

        /// Name the message is attributed to.
        #[arg(long, default_value = "User")]
        name: String,

        /// Pronouns recorded alongside the name.
        #[arg(long)]
        pronouns: Option<String>,

        /// The message text.
        text: String,
    },

    /// Print a conversation's transcript.
    History {
        #[arg(short, long)]
        conversation: String,
    },

    /// Delete all of a conversation's messages.
    Clear {
        #[arg(short, long)]
        conversation: String,
    },
}

pub fn parse() -> Args {
    Args::parse()
}
