//! OpenAI-compatible chat completions client.
//!
//! Serves both api.openai.com and OpenRouter, which exposes the same
//! chat/completions surface under a different base URL and key.

mod api;
mod client;
mod config;

pub use client::OpenAiChatModel;
pub use config::OpenAiConfig;
