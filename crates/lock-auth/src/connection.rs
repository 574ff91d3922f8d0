//! Connection model
//!
//! A connection is a named identity-provider configuration on the tenant
//! (database, passwordless, social or enterprise). Its attributes are an
//! open key→value map as delivered by the tenant; the few keys Lock cares
//! about (`domain`, `domain_aliases`) get typed accessors.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

const KEY_NAME: &str = "name";
const KEY_DOMAIN: &str = "domain";
const KEY_DOMAIN_ALIASES: &str = "domain_aliases";

/// Strategies whose connections are enterprise (corporate IdP) connections.
const ENTERPRISE_STRATEGIES: &[&str] = &[
    "ad",
    "adfs",
    "auth0-adldap",
    "custom",
    "google-apps",
    "google-openid",
    "ip",
    "mscrm",
    "office365",
    "pingfederate",
    "samlp",
    "sharepoint",
    "waad",
];

/// Strategies that can authenticate with username/password directly
/// (resource owner) instead of a web redirect.
const ACTIVE_FLOW_STRATEGIES: &[&str] = &["ad", "adfs", "waad"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Database,
    Passwordless,
    Social,
    Enterprise,
}

/// Immutable connection: name, strategy and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    name: String,
    strategy: String,
    attributes: Map<String, Value>,
}

impl Connection {
    /// Build a connection from its tenant attributes.
    ///
    /// The `name` attribute is required, must be a non-empty string, and is
    /// moved out of the attribute map.
    pub fn new(strategy: impl Into<String>, mut attributes: Map<String, Value>) -> Result<Self> {
        let name = match attributes.remove(KEY_NAME) {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            Some(_) => {
                return Err(Error::InvalidInput(
                    "connection name must be a non-empty string".into(),
                ));
            }
            None => return Err(Error::InvalidInput("connection must have a name".into())),
        };
        Ok(Self {
            name,
            strategy: strategy.into(),
            attributes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn value_for_key(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn str_for_key(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Missing or non-boolean values read as false.
    pub fn bool_for_key(&self, key: &str) -> bool {
        self.attributes
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Primary email domain of an enterprise connection.
    pub fn domain(&self) -> Option<&str> {
        self.str_for_key(KEY_DOMAIN)
    }

    /// Additional email domains, in configured order. Non-string entries
    /// are ignored.
    pub fn domain_aliases(&self) -> Vec<&str> {
        self.attributes
            .get(KEY_DOMAIN_ALIASES)
            .and_then(Value::as_array)
            .map(|aliases| aliases.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Lower-cased primary domain plus aliases; empty when there is no
    /// primary domain.
    pub fn domain_set(&self) -> BTreeSet<String> {
        let Some(domain) = self.domain() else {
            return BTreeSet::new();
        };
        std::iter::once(domain)
            .chain(self.domain_aliases())
            .map(str::to_lowercase)
            .collect()
    }

    pub fn connection_type(&self) -> ConnectionType {
        match self.strategy.as_str() {
            "auth0" => ConnectionType::Database,
            "sms" | "email" => ConnectionType::Passwordless,
            s if ENTERPRISE_STRATEGIES.contains(&s) => ConnectionType::Enterprise,
            _ => ConnectionType::Social,
        }
    }

    pub fn is_active_flow_enabled(&self) -> bool {
        ACTIVE_FLOW_STRATEGIES.contains(&self.strategy.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn name_is_extracted_from_attributes() {
        let connection = Connection::new(
            "adfs",
            attributes(json!({"name": "corp", "domain": "corp.com"})),
        )
        .unwrap();
        assert_eq!(connection.name(), "corp");
        assert_eq!(connection.strategy(), "adfs");
        assert!(connection.value_for_key("name").is_none());
        assert_eq!(connection.domain(), Some("corp.com"));
    }

    #[test]
    fn missing_or_empty_name_is_rejected() {
        assert!(Connection::new("adfs", attributes(json!({"domain": "corp.com"}))).is_err());
        assert!(Connection::new("adfs", attributes(json!({"name": ""}))).is_err());
        assert!(Connection::new("adfs", attributes(json!({"name": 42}))).is_err());
        assert!(Connection::new("adfs", Map::new()).is_err());
    }

    #[test]
    fn aliases_keep_order_and_skip_non_strings() {
        let connection = Connection::new(
            "waad",
            attributes(json!({
                "name": "corp",
                "domain": "corp.com",
                "domain_aliases": ["corp.io", 7, "corp.net"]
            })),
        )
        .unwrap();
        assert_eq!(connection.domain_aliases(), vec!["corp.io", "corp.net"]);
    }

    #[test]
    fn domain_set_is_lowercased_and_requires_primary() {
        let connection = Connection::new(
            "adfs",
            attributes(json!({"name": "c", "domain": "Corp.COM", "domain_aliases": ["CORP.io"]})),
        )
        .unwrap();
        let domains: Vec<_> = connection.domain_set().into_iter().collect();
        assert_eq!(domains, vec!["corp.com", "corp.io"]);

        let no_primary = Connection::new(
            "adfs",
            attributes(json!({"name": "c", "domain_aliases": ["corp.io"]})),
        )
        .unwrap();
        assert!(no_primary.domain_set().is_empty());
    }

    #[test]
    fn classifies_by_strategy() {
        let of = |strategy: &str| {
            Connection::new(strategy, attributes(json!({"name": "c"})))
                .unwrap()
                .connection_type()
        };
        assert_eq!(of("auth0"), ConnectionType::Database);
        assert_eq!(of("sms"), ConnectionType::Passwordless);
        assert_eq!(of("email"), ConnectionType::Passwordless);
        assert_eq!(of("adfs"), ConnectionType::Enterprise);
        assert_eq!(of("google-apps"), ConnectionType::Enterprise);
        assert_eq!(of("github"), ConnectionType::Social);
    }

    #[test]
    fn active_flow_only_for_directory_strategies() {
        let of = |strategy: &str| {
            Connection::new(strategy, attributes(json!({"name": "c"})))
                .unwrap()
                .is_active_flow_enabled()
        };
        assert!(of("ad"));
        assert!(of("adfs"));
        assert!(of("waad"));
        assert!(!of("samlp"));
        assert!(!of("github"));
    }

    #[test]
    fn bool_for_key_defaults_to_false() {
        let connection = Connection::new(
            "auth0",
            attributes(json!({"name": "db", "showSignup": true, "odd": "yes"})),
        )
        .unwrap();
        assert!(connection.bool_for_key("showSignup"));
        assert!(!connection.bool_for_key("odd"));
        assert!(!connection.bool_for_key("absent"));
    }
}
