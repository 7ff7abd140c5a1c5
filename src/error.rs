//! Error types for the quote wizard.

use crate::client::Endpoint;
use crate::flow::Phase;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures talking to the step-processor.
///
/// These never reach the user directly; the step client folds them into a
/// generic error reply.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid step-processor URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: Endpoint, reason: String },

    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: Endpoint, reason: String },
}

/// Conversation state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },
}

/// Reference step-processor errors.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("Failed to bind desk server on port {port}: {reason}")]
    Bind { port: u16, reason: String },

    #[error("Desk server stopped: {0}")]
    Serve(String),

    #[error("Lead store write failed: {0}")]
    LeadStore(#[from] std::io::Error),

    #[error("Lead serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Summary e-mail errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP send failed: {0}")]
    Send(String),
}
