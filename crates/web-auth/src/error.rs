//! Error types for the redirect coordinator

/// Errors returned directly to the caller of the coordinator.
///
/// Login failures are not errors here: they are posted to the result channel
/// as `AuthCallbackResult::Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `start` was called while another attempt is still pending.
    #[error("a login attempt is already in progress; cancel it or wait for its result")]
    FlowInProgress,

    #[error("failed to launch authorize URI: {0}")]
    Launch(String),
}

/// Result alias for coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;
