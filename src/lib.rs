//! Quote Wizard: step-by-step insurance quote chat.

pub mod channels;
pub mod chat;
pub mod client;
pub mod config;
pub mod desk;
pub mod error;
pub mod flow;
