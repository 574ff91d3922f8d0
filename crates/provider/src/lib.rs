//! Provider resolution for redirect-based logins
//!
//! Defines the `AuthRequest` descriptor the app hands to the coordinator and
//! the `AuthProvider` / `AuthHandler` traits that let an app customize how a
//! given strategy or connection is launched. `AuthResolver` is the registry
//! that ties them together. It is an ordinary value owned by whoever builds
//! the coordinator; there is no process-wide handler list.
//!
//! Resolution order: handlers are asked in registration order and the first
//! provider returned wins. When nothing matches, the coordinator uses its
//! own defaults.

pub mod configured;

pub use configured::{ConfiguredHandler, ConfiguredProvider, ProviderRule};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

/// How the authorize URI is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// External browser; the result comes back as a deep link.
    Browser,
    /// Embedded web surface; the result comes back as an activity result
    /// tagged with the request code.
    Embedded,
}

/// One login the app wants to start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequest {
    /// Connection name sent as `connection`; `None` shows the hosted login page.
    pub connection: Option<String>,
    /// Strategy of the connection, used only for provider resolution.
    pub strategy: Option<String>,
    /// What the user typed (username or email); becomes `login_hint`.
    pub identity: Option<String>,
    /// Extra /authorize parameters.
    pub parameters: BTreeMap<String, String>,
    /// Overrides the coordinator's default launch mode.
    pub launch_mode: Option<LaunchMode>,
}

impl AuthRequest {
    pub fn for_connection(connection: impl Into<String>) -> Self {
        Self {
            connection: Some(connection.into()),
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_launch_mode(mut self, mode: LaunchMode) -> Self {
        self.launch_mode = Some(mode);
        self
    }
}

/// Errors from provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Customizes how one kind of login is launched.
pub trait AuthProvider: Send + Sync {
    /// Identifier for logging (e.g. "configured:corp-adfs")
    fn id(&self) -> &str;

    /// Adjust the request before the authorize URI is built: add
    /// parameters, force a launch mode, or refuse the login.
    fn prepare(&self, request: &mut AuthRequest) -> Result<()>;
}

/// Produces providers for a strategy/connection pair.
pub trait AuthHandler: Send + Sync {
    fn provider_for(&self, strategy: Option<&str>, connection: &str)
    -> Option<Arc<dyn AuthProvider>>;
}

/// Ordered registry of handlers.
#[derive(Default, Clone)]
pub struct AuthResolver {
    handlers: Vec<Arc<dyn AuthHandler>>,
}

impl AuthResolver {
    pub fn new(handlers: Vec<Arc<dyn AuthHandler>>) -> Self {
        Self { handlers }
    }

    pub fn with_handler(mut self, handler: Arc<dyn AuthHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// First provider any handler offers for the pair, or `None`.
    pub fn provider_for(
        &self,
        strategy: Option<&str>,
        connection: &str,
    ) -> Option<Arc<dyn AuthProvider>> {
        let provider = self
            .handlers
            .iter()
            .find_map(|handler| handler.provider_for(strategy, connection));
        debug!(
            ?strategy,
            connection,
            provider = provider.as_ref().map(|p| p.id()),
            "resolved auth provider"
        );
        provider
    }
}
