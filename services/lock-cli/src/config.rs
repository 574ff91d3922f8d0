//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! `LOCK_CLIENT_ID` overrides `account.client_id` so a shared file can be
//! reused across applications.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lock_auth::{Connection, MatchOptions, endpoints};
use provider::{LaunchMode, ProviderRule};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;
use web_auth::{CoordinatorConfig, DEFAULT_REQUEST_CODE};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub providers: Vec<ProviderRule>,
}

/// Tenant and application identity
#[derive(Debug, Deserialize)]
pub struct AccountConfig {
    pub client_id: String,
    /// Tenant domain, bare host or http(s) URL
    pub domain: String,
    /// Telemetry value sent as `auth0Client`
    #[serde(default)]
    pub client_info: Option<String>,
}

/// How logins are launched and completed
#[derive(Debug, Deserialize)]
pub struct FlowConfig {
    #[serde(default = "default_true")]
    pub use_browser: bool,
    #[serde(default = "default_true")]
    pub pkce: bool,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_request_code")]
    pub request_code: i32,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_true")]
    pub case_sensitive_domains: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            use_browser: true,
            pkce: true,
            scope: default_scope(),
            request_code: DEFAULT_REQUEST_CODE,
            package_name: None,
            redirect_uri: None,
            case_sensitive_domains: true,
        }
    }
}

/// Enterprise connection used for email-domain matching
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub strategy: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub domain_aliases: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_scope() -> String {
    lock_auth::constants::SCOPE_OPENID.to_owned()
}

fn default_request_code() -> i32 {
    DEFAULT_REQUEST_CODE
}

impl Config {
    /// Load configuration from a TOML file, overlay environment variables,
    /// then validate.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(client_id) = std::env::var("LOCK_CLIENT_ID") {
            config.account.client_id = client_id;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.account.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        let domain = self.account.domain.trim();
        if domain.contains("://") && !domain.starts_with("http://") && !domain.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "domain must be an http(s) URL or a bare host, got: {domain}"
            )));
        }
        self.tenant()?;

        if self.flow.request_code < 0 {
            return Err(common::Error::Config(format!(
                "request_code must not be negative, got: {}",
                self.flow.request_code
            )));
        }

        self.redirect_uri()?;

        let mut names = HashSet::new();
        for connection in &self.connections {
            if connection.name.trim().is_empty() {
                return Err(common::Error::Config(
                    "connection name must not be empty".into(),
                ));
            }
            if !names.insert(connection.name.as_str()) {
                return Err(common::Error::Config(format!(
                    "duplicate connection name: {}",
                    connection.name
                )));
            }
        }

        for rule in &self.providers {
            rule.validate()
                .map_err(|e| common::Error::Config(e.to_string()))?;
        }
        Ok(())
    }

    /// Tenant base URL
    pub fn tenant(&self) -> common::Result<Url> {
        endpoints::tenant_url(&self.account.domain)
            .map_err(|e| common::Error::Config(e.to_string()))
    }

    /// Explicit `redirect_uri`, else the app-link callback for `package_name`.
    pub fn redirect_uri(&self) -> common::Result<Url> {
        if let Some(raw) = &self.flow.redirect_uri {
            return Url::parse(raw)
                .map_err(|e| common::Error::Config(format!("invalid redirect_uri {raw}: {e}")));
        }
        let Some(package) = &self.flow.package_name else {
            return Err(common::Error::Config(
                "flow.package_name or flow.redirect_uri must be set".into(),
            ));
        };
        endpoints::callback_uri(&self.tenant()?, package)
            .map_err(|e| common::Error::Config(e.to_string()))
    }

    pub fn coordinator_config(&self) -> common::Result<CoordinatorConfig> {
        let mut config = CoordinatorConfig::new(
            self.account.client_id.clone(),
            self.tenant()?,
            self.redirect_uri()?,
        );
        config.scope = self.flow.scope.clone();
        config.launch_mode = if self.flow.use_browser {
            LaunchMode::Browser
        } else {
            LaunchMode::Embedded
        };
        config.request_code = self.flow.request_code;
        config.use_pkce = self.flow.pkce;
        config.client_info = self.account.client_info.clone();
        Ok(config)
    }

    /// Build the connection models for the enterprise matcher.
    pub fn connections(&self) -> common::Result<Vec<Connection>> {
        self.connections
            .iter()
            .map(|c| {
                let mut attributes = Map::new();
                attributes.insert("name".into(), Value::String(c.name.clone()));
                if let Some(domain) = &c.domain {
                    attributes.insert("domain".into(), Value::String(domain.clone()));
                }
                attributes.insert(
                    "domain_aliases".into(),
                    Value::Array(
                        c.domain_aliases
                            .iter()
                            .cloned()
                            .map(Value::String)
                            .collect(),
                    ),
                );
                Connection::new(c.strategy.clone(), attributes)
                    .map_err(|e| common::Error::Config(e.to_string()))
            })
            .collect()
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            case_sensitive: self.flow.case_sensitive_domains,
        }
    }

    /// Resolve config file path from CLI arg or LOCK_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("LOCK_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("lock.toml")
    }
}
