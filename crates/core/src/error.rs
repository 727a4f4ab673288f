//! Error types for the CharChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use serde::Serialize;
use thiserror::Error;

/// The top-level error type for all CharChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Reply parsing ---
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    // --- Persistence ---
    #[error("State error: {0}")]
    State(#[from] StateError),

    // --- Migrations ---
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport or provider failure from a completion / image call.
///
/// Serializable so it can be embedded verbatim in an error-role chat entry.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Provider not configured: {message}")]
    NotConfigured { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Malformed provider response: {message}")]
    MalformedResponse { message: String },
}

impl ProviderError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse { message: message.into() }
    }
}

/// A provider reply that could not be read as structured data.
#[derive(Debug, Clone, Error)]
#[error("Reply is not valid structured data ({reason}): {text:?}")]
pub struct ParseError {
    /// The reply text after noise stripping.
    pub text: String,
    /// The deserializer's complaint.
    pub reason: String,
}

#[derive(Debug, Clone, Error)]
pub enum StateError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Error)]
pub enum MigrationError {
    #[error("Migration from version {version} does not exist")]
    NoSourceSchema { version: u32 },

    #[error("No migration registered for version {version}")]
    MissingStep { version: u32 },

    #[error("Snapshot at version {version} is invalid: {reason}")]
    InvalidSnapshot { version: u32, reason: String },

    #[error("{0}")]
    Store(#[from] StateError),
}

impl MigrationError {
    /// Whether the failure came from the storage engine running out of room.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Store(StateError::QuotaExceeded(_)))
            || self.to_string().to_lowercase().contains("quota")
    }
}
