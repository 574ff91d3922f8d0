//! Error types for authentication primitives

/// Errors from token exchange and model construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The authorization server answered with an `error` payload.
    #[error("authorization server returned {error}: {description}")]
    Api { error: String, description: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("PKCE unavailable: {0}")]
    PkceUnavailable(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
