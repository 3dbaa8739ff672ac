//! Two-phase conversation sessions.
//!
//! A `ChatSession` loads a conversation's history, asks the caller
//! model which integrations the turn needs, runs them, and asks the
//! primary (or a distinct grounding) model for the answer. Model
//! failures degrade the turn to a fixed apology; only store failures
//! surface as errors.

mod chat;
mod context;
mod manager;
mod types;

pub use context::{EngineContext, ModelPool};
pub use manager::ChatSession;
pub use types::{DegradeCause, SessionOptions, TurnOutcome, TurnReply};
