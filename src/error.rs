//! Error taxonomy for the frontend.
//!
//! A missing save is never an error: store reads surface it as `Ok(None)`
//! and the session layer reports it as its own feedback variant.

use thiserror::Error;

/// Failure talking to the backend save store or catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The request hit the client-side deadline and was aborted.
    #[error("request timed out")]
    Timeout,
    /// The backend answered with an unexpected status code.
    #[error("backend returned status {0}")]
    Status(u16),
    /// The request never completed (network fault, fetch rejection).
    #[error("network error: {0}")]
    Network(String),
    /// The backend answered but the payload did not parse.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Failure reported by the emulator capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmulatorError {
    #[error("emulator is not initialized")]
    NotInitialized,
    #[error("emulator rejected the save data")]
    RestoreRejected,
}

/// Fatal misconfiguration of a player session. Terminal for the view, no
/// retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required query parameter `{0}`")]
    MissingParam(&'static str),
}
