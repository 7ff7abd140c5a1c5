//! Questionnaire flow: the nine-step script and the engine that runs it.
//!
//! The engine owns one [`Session`] at a time. Phases only move forward along
//! the script, or jump to `Blocked`; the only way back is a full restart.

pub mod engine;
pub mod phase;
pub mod script;
pub mod session;

pub use engine::{Conversation, Outcome};
pub use phase::Phase;
pub use script::Prompt;
pub use session::Session;
