//! Subcommand implementations.

pub mod clear;
pub mod history;
pub mod send;
