//! Protocol constants
//!
//! Parameter names used on the /authorize request and the redirect callback,
//! plus the caller-facing failure messages. Messages are plain English; the
//! embedding application is free to map `ErrorKind` to its own strings.

/// Path of the authorize endpoint relative to the tenant domain
pub const AUTHORIZE_PATH: &str = "authorize";

/// Path of the token endpoint relative to the tenant domain
pub const TOKEN_PATH: &str = "oauth/token";

pub const KEY_RESPONSE_TYPE: &str = "response_type";
pub const KEY_CODE_CHALLENGE: &str = "code_challenge";
pub const KEY_CODE_CHALLENGE_METHOD: &str = "code_challenge_method";
pub const KEY_SCOPE: &str = "scope";
pub const KEY_CONNECTION: &str = "connection";
pub const KEY_CLIENT_ID: &str = "client_id";
pub const KEY_REDIRECT_URI: &str = "redirect_uri";
pub const KEY_STATE: &str = "state";
pub const KEY_LOGIN_HINT: &str = "login_hint";
pub const KEY_CLIENT_INFO: &str = "auth0Client";

pub const KEY_CODE: &str = "code";
pub const KEY_ERROR: &str = "error";
pub const KEY_ID_TOKEN: &str = "id_token";
pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_TOKEN_TYPE: &str = "token_type";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";

pub const RESPONSE_TYPE_TOKEN: &str = "token";
pub const RESPONSE_TYPE_CODE: &str = "code";
pub const METHOD_SHA_256: &str = "S256";
pub const SCOPE_OPENID: &str = "openid";

/// `error` value sent when the user declines consent at the provider
pub const ERROR_ACCESS_DENIED: &str = "access_denied";

pub const MSG_ERROR_TITLE: &str = "There was an error during authentication";
pub const MSG_ACCESS_DENIED: &str = "Permissions were not granted. Please try again.";
pub const MSG_PROVIDER_ERROR: &str =
    "Failed to authenticate with the identity provider. Please try again.";
pub const MSG_INVALID_STATE: &str = "The received state is invalid. Please try again.";
pub const MSG_UNEXPECTED_CALLBACK: &str =
    "The identity provider returned an empty response. Please try again.";
pub const MSG_INVALID_AUTHORIZE_URL: &str =
    "The authorize URL is invalid. Check the Lock configuration.";
pub const MSG_TRANSPORT_ERROR: &str =
    "Could not reach the authentication server. Check your connection and try again.";
pub const MSG_INVALID_EMAIL: &str = "The email address is not valid.";
pub const MSG_NO_MATCHING_CONNECTION: &str =
    "There is no enterprise connection configured for this email domain.";
