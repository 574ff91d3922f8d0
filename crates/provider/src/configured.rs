//! Config-driven providers
//!
//! Each `[[providers]]` rule names a strategy and/or connection and says how
//! matching logins are launched: browser vs embedded surface, and which
//! extra /authorize parameters to add.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::{AuthHandler, AuthProvider, AuthRequest, LaunchMode, ProviderError, Result};

/// Parameters the coordinator owns; providers may not set them.
const RESERVED_PARAMETERS: &[&str] = &[
    "client_id",
    "redirect_uri",
    "response_type",
    "state",
    "code_challenge",
    "code_challenge_method",
    "connection",
];

/// One provider rule from configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProviderRule {
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default)]
    pub use_browser: Option<bool>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl ProviderRule {
    /// A rule must name at least a strategy or a connection.
    pub fn validate(&self) -> Result<()> {
        if self.strategy.is_none() && self.connection.is_none() {
            return Err(ProviderError::Rejected(
                "provider rule must set strategy or connection".into(),
            ));
        }
        Ok(())
    }

    fn matches(&self, strategy: Option<&str>, connection: &str) -> bool {
        let strategy_ok = match &self.strategy {
            Some(expected) => strategy == Some(expected.as_str()),
            None => true,
        };
        let connection_ok = match &self.connection {
            Some(expected) => expected == connection,
            None => true,
        };
        strategy_ok && connection_ok
    }
}

/// Provider built from a matched rule.
#[derive(Debug)]
pub struct ConfiguredProvider {
    id: String,
    launch_mode: Option<LaunchMode>,
    parameters: BTreeMap<String, String>,
}

impl ConfiguredProvider {
    pub fn from_rule(rule: &ProviderRule) -> Self {
        let target = rule
            .connection
            .as_deref()
            .or(rule.strategy.as_deref())
            .unwrap_or("any");
        Self {
            id: format!("configured:{target}"),
            launch_mode: rule.use_browser.map(|browser| {
                if browser {
                    LaunchMode::Browser
                } else {
                    LaunchMode::Embedded
                }
            }),
            parameters: rule.parameters.clone(),
        }
    }
}

impl AuthProvider for ConfiguredProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn prepare(&self, request: &mut AuthRequest) -> Result<()> {
        for (key, value) in &self.parameters {
            if RESERVED_PARAMETERS.contains(&key.as_str()) {
                warn!(provider = %self.id, parameter = %key, "refusing to override reserved authorize parameter");
                continue;
            }
            request.parameters.insert(key.clone(), value.clone());
        }
        if let Some(mode) = self.launch_mode {
            request.launch_mode = Some(mode);
        }
        Ok(())
    }
}

/// Handler answering from a fixed list of rules, first match wins.
#[derive(Debug, Default)]
pub struct ConfiguredHandler {
    rules: Vec<ProviderRule>,
}

impl ConfiguredHandler {
    pub fn new(rules: Vec<ProviderRule>) -> Result<Self> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }
}

impl AuthHandler for ConfiguredHandler {
    fn provider_for(
        &self,
        strategy: Option<&str>,
        connection: &str,
    ) -> Option<Arc<dyn AuthProvider>> {
        self.rules
            .iter()
            .find(|rule| rule.matches(strategy, connection))
            .map(|rule| Arc::new(ConfiguredProvider::from_rule(rule)) as Arc<dyn AuthProvider>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(strategy: Option<&str>, connection: Option<&str>) -> ProviderRule {
        ProviderRule {
            strategy: strategy.map(str::to_owned),
            connection: connection.map(str::to_owned),
            use_browser: None,
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn rule_without_target_is_rejected() {
        assert!(ConfiguredHandler::new(vec![rule(None, None)]).is_err());
        assert!(ConfiguredHandler::new(vec![rule(Some("adfs"), None)]).is_ok());
    }

    #[test]
    fn matches_by_connection_and_strategy() {
        let handler = ConfiguredHandler::new(vec![
            rule(Some("adfs"), Some("corp")),
            rule(Some("github"), None),
        ])
        .unwrap();

        assert!(handler.provider_for(Some("adfs"), "corp").is_some());
        assert!(handler.provider_for(Some("adfs"), "other").is_none());
        assert!(handler.provider_for(None, "corp").is_none());
        assert_eq!(
            handler.provider_for(Some("github"), "github").unwrap().id(),
            "configured:github"
        );
    }

    #[test]
    fn provider_adds_parameters_and_launch_mode() {
        let mut configured = rule(None, Some("corp"));
        configured.use_browser = Some(false);
        configured
            .parameters
            .insert("prompt".into(), "login".into());
        let provider = ConfiguredProvider::from_rule(&configured);

        let mut request = AuthRequest::for_connection("corp");
        provider.prepare(&mut request).unwrap();
        assert_eq!(request.launch_mode, Some(LaunchMode::Embedded));
        assert_eq!(request.parameters.get("prompt").map(String::as_str), Some("login"));
    }

    #[test]
    fn provider_skips_reserved_parameters() {
        let mut configured = rule(None, Some("corp"));
        configured
            .parameters
            .insert("client_id".into(), "hijack".into());
        configured
            .parameters
            .insert("audience".into(), "https://api.example.com".into());
        let provider = ConfiguredProvider::from_rule(&configured);

        let mut request = AuthRequest::for_connection("corp");
        provider.prepare(&mut request).unwrap();
        assert!(!request.parameters.contains_key("client_id"));
        assert!(request.parameters.contains_key("audience"));
        assert_eq!(request.launch_mode, None);
    }

    #[test]
    fn rules_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            providers: Vec<ProviderRule>,
        }
        let doc: Doc = toml::from_str(
            r#"
[[providers]]
connection = "corp"
use_browser = false
[providers.parameters]
prompt = "login"
"#,
        )
        .unwrap();
        assert_eq!(doc.providers.len(), 1);
        assert_eq!(doc.providers[0].use_browser, Some(false));
        assert_eq!(doc.providers[0].parameters["prompt"], "login");
    }
}
