//! Switchboard command line: one-shot conversation turns over the
//! engine, plus transcript and cleanup commands.

mod cli;
mod commands;

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use switchboard_engine::{builtin_integrations, EngineContext, IntegrationSet, Settings};

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Workspace root, two levels up from crates/switchboard-cli/
        manifest_dir.join("..").join("..").join(".env"),
        // Current directory
        std::path::PathBuf::from(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env before settings read the environment
    load_dotenv();

    let args = cli::parse();

    let log_directive = args.log_level.as_deref().unwrap_or("switchboard=info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "switchboard=info".parse().unwrap()),
            ),
        )
        .init();

    if let Err(err) = run(args).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: cli::Args) -> switchboard_common::Result<()> {
    let settings = Settings::load(args.config.as_deref().map(Path::new))?;
    tracing::debug!(
        provider = %settings.models.provider,
        model = %settings.models.model,
        "settings loaded"
    );

    let context = Arc::new(EngineContext::new(
        settings,
        IntegrationSet::new(builtin_integrations()),
    )?);

    match args.command {
        cli::Command::Send {
            conversation,
            name,
            pronouns,
            text,
        } => commands::send::run(&context, &conversation, &name, pronouns.as_deref(), &text).await,
        cli::Command::History { conversation } => {
            commands::history::run(&context, &conversation).await
        }
        cli::Command::Clear { conversation } => commands::clear::run(&context, &conversation).await,
    }
}
