//! Ollama chat client for locally hosted models.

mod api;
mod client;
mod config;

pub use client::OllamaChatModel;
pub use config::OllamaConfig;
