//! Lock authentication primitives
//!
//! Protocol pieces shared by every redirect-based login: callback URI
//! parsing, PKCE generation and code exchange, the connection model, the
//! enterprise domain matcher and the passwordless magic-link parser. This
//! crate holds no flow state; the coordinator in `web-auth` drives these.
//!
//! Code flow:
//! 1. Coordinator creates a `PkceState` and sends its challenge to /authorize
//! 2. Browser redirects back; `callback::parse()` extracts the parameters
//! 3. `PkceState::exchange_code_for_token()` trades the code for `Credentials`
//!
//! Implicit flow skips step 3 and reads `Credentials` straight from the callback.

pub mod callback;
pub mod connection;
pub mod constants;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod magic_link;
pub mod matcher;
pub mod pkce;
pub mod token;

pub use callback::CallbackParameters;
pub use connection::{Connection, ConnectionType};
pub use credentials::{AuthCallbackResult, AuthFailure, Credentials, ErrorKind};
pub use error::{Error, Result};
pub use magic_link::{MagicLink, MagicLinkMode, parse_magic_link};
pub use matcher::{EnterpriseConnectionMatcher, MatchOptions};
pub use pkce::{PkceState, compute_challenge, generate_verifier, is_available};
pub use token::{CodeExchange, HttpTokenClient, TokenExchanger};
