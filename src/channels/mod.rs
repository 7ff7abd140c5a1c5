//! Front ends that carry the conversation to a user.

pub mod cli;

pub use cli::{CliChannel, CliView};
