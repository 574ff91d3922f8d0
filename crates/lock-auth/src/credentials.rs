//! Flow outcomes handed back to application code
//!
//! Every login attempt ends in exactly one `AuthCallbackResult`. Failures
//! carry a machine-readable `ErrorKind` plus a short title/description pair
//! suitable for showing to the user as-is.

use common::Secret;
use serde::Deserialize;

use crate::callback::CallbackParameters;
use crate::constants::{
    ERROR_ACCESS_DENIED, KEY_ACCESS_TOKEN, KEY_ID_TOKEN, KEY_REFRESH_TOKEN, KEY_TOKEN_TYPE,
    MSG_ACCESS_DENIED, MSG_ERROR_TITLE, MSG_INVALID_AUTHORIZE_URL, MSG_INVALID_EMAIL,
    MSG_INVALID_STATE, MSG_NO_MATCHING_CONNECTION, MSG_PROVIDER_ERROR, MSG_TRANSPORT_ERROR,
    MSG_UNEXPECTED_CALLBACK,
};
use crate::error::Error;

/// Tokens obtained from a completed login.
///
/// Every field is optional: the implicit flow returns whatever the provider
/// put in the callback, and a missing key is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub access_token: Option<Secret<String>>,
    pub id_token: Option<Secret<String>>,
    pub token_type: Option<String>,
    pub refresh_token: Option<Secret<String>>,
}

impl Credentials {
    /// Read the implicit-flow token keys from callback parameters.
    pub fn from_parameters(values: &CallbackParameters) -> Self {
        let secret = |key: &str| values.get(key).map(|v| Secret::new(v.to_owned()));
        Self {
            access_token: secret(KEY_ACCESS_TOKEN),
            id_token: secret(KEY_ID_TOKEN),
            token_type: values.get(KEY_TOKEN_TYPE).map(str::to_owned),
            refresh_token: secret(KEY_REFRESH_TOKEN),
        }
    }
}

/// Caller-facing failure taxonomy. Every kind is recoverable by retrying
/// the flow or prompting the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed email or domain
    InvalidInput,
    /// No enterprise connection claims the email domain
    NoMatchingConnection,
    /// User declined consent at the provider
    AccessDenied,
    /// Generic upstream failure
    ProviderError,
    /// Network or I/O failure talking to the token endpoint
    TransportError,
    /// Redirect carried no recognizable parameters
    UnexpectedCallback,
    /// Returned `state` does not match the one sent at start
    InvalidState,
    /// The authorize URL could not be built from configuration
    InvalidConfiguration,
}

impl ErrorKind {
    /// Stable snake_case label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NoMatchingConnection => "no_matching_connection",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::UnexpectedCallback => "unexpected_callback",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidConfiguration => "invalid_configuration",
        }
    }

    fn default_description(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => MSG_INVALID_EMAIL,
            ErrorKind::NoMatchingConnection => MSG_NO_MATCHING_CONNECTION,
            ErrorKind::AccessDenied => MSG_ACCESS_DENIED,
            ErrorKind::ProviderError => MSG_PROVIDER_ERROR,
            ErrorKind::TransportError => MSG_TRANSPORT_ERROR,
            ErrorKind::UnexpectedCallback => MSG_UNEXPECTED_CALLBACK,
            ErrorKind::InvalidState => MSG_INVALID_STATE,
            ErrorKind::InvalidConfiguration => MSG_INVALID_AUTHORIZE_URL,
        }
    }
}

/// A failed login: kind, human-readable title and description, and the
/// underlying error when there is one.
#[derive(Debug)]
pub struct AuthFailure {
    pub kind: ErrorKind,
    pub title: String,
    pub description: String,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl AuthFailure {
    /// Failure with the standard title and the kind's default description.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            title: MSG_ERROR_TITLE.to_owned(),
            description: kind.default_description().to_owned(),
            cause: None,
        }
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Map the `error` value of a redirect callback.
    ///
    /// `access_denied` (any ASCII case) gets the consent-specific message;
    /// every other value, including garbage, gets the generic one.
    pub fn from_callback_error(value: &str) -> Self {
        if value.eq_ignore_ascii_case(ERROR_ACCESS_DENIED) {
            Self::new(ErrorKind::AccessDenied)
        } else {
            Self::new(ErrorKind::ProviderError)
        }
    }

    /// Map a failed authorization-code exchange.
    pub fn from_exchange_error(error: Error) -> Self {
        let kind = match &error {
            Error::Http(_) => ErrorKind::TransportError,
            Error::Api { error, .. } if error.eq_ignore_ascii_case(ERROR_ACCESS_DENIED) => {
                ErrorKind::AccessDenied
            }
            _ => ErrorKind::ProviderError,
        };
        Self::new(kind).with_cause(error)
    }
}

/// Terminal outcome of one login attempt.
#[derive(Debug)]
pub enum AuthCallbackResult {
    Success(Credentials),
    Error(AuthFailure),
    Cancelled,
}

impl AuthCallbackResult {
    /// Outcome label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthCallbackResult::Success(_) => "success",
            AuthCallbackResult::Error(failure) => failure.kind.as_str(),
            AuthCallbackResult::Cancelled => "cancelled",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthCallbackResult::Success(_))
    }
}
