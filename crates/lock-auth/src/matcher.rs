//! Enterprise connection lookup by email domain
//!
//! Given what the user typed into the email field, find the enterprise
//! connection whose primary domain or one of its aliases matches the email's
//! domain. Candidates are scanned in order and the first match wins.

use tracing::{debug, trace};

use crate::connection::Connection;

const AT_SYMBOL: char = '@';

/// Domain comparison settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Exact comparison when true; ASCII case-insensitive otherwise.
    pub case_sensitive: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

pub struct EnterpriseConnectionMatcher {
    connections: Vec<Connection>,
    options: MatchOptions,
}

impl EnterpriseConnectionMatcher {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self::with_options(connections, MatchOptions::default())
    }

    pub fn with_options(connections: Vec<Connection>, options: MatchOptions) -> Self {
        debug!(
            connections = connections.len(),
            case_sensitive = options.case_sensitive,
            "created enterprise connection matcher"
        );
        Self {
            connections,
            options,
        }
    }

    /// Find the connection claiming the domain of `identity`.
    ///
    /// Returns `None` for an empty candidate list, an identity that isn't a
    /// syntactically valid email, or an unclaimed domain.
    pub fn parse(&self, identity: &str) -> Option<&Connection> {
        let domain = extract_domain(identity)?;
        let found = self.connections.iter().find(|connection| {
            connection
                .domain()
                .is_some_and(|primary| self.domains_equal(primary, domain))
                || connection
                    .domain_aliases()
                    .into_iter()
                    .any(|alias| self.domains_equal(alias, domain))
        });
        trace!(domain, matched = ?found.map(Connection::name), "enterprise domain lookup");
        found
    }

    /// Local part of `identity` (before the first `@`), or the whole
    /// identity when it has no `@`.
    pub fn extract_username(identity: &str) -> &str {
        identity
            .split_once(AT_SYMBOL)
            .map_or(identity, |(local, _)| local)
    }

    /// Primary domain of a previously matched connection.
    pub fn domain_for_connection(connection: &Connection) -> Option<&str> {
        connection.domain()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn domains_equal(&self, candidate: &str, domain: &str) -> bool {
        if self.options.case_sensitive {
            candidate == domain
        } else {
            candidate.eq_ignore_ascii_case(domain)
        }
    }
}

/// Domain part of an email, if `identity` looks like one.
///
/// Valid means: non-empty local part, non-empty domain, a single `@`, and
/// no whitespace.
fn extract_domain(identity: &str) -> Option<&str> {
    if identity.chars().any(char::is_whitespace) {
        return None;
    }
    let (local, domain) = identity.split_once(AT_SYMBOL)?;
    if local.is_empty() || domain.is_empty() || domain.contains(AT_SYMBOL) {
        return None;
    }
    Some(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn connection(name: &str, domain: &str, aliases: &[&str]) -> Connection {
        let Value::Object(map) = json!({
            "name": name,
            "domain": domain,
            "domain_aliases": aliases,
        }) else {
            unreachable!()
        };
        Connection::new("adfs", map).unwrap()
    }

    fn matcher() -> EnterpriseConnectionMatcher {
        EnterpriseConnectionMatcher::new(vec![
            connection("MyAD", "auth10.com", &["auth10.com", "mydomain.com", "otherdomain.com"]),
            connection("MyOtherAD", "auth0.com", &["auth0.com", "auth0.io"]),
        ])
    }

    #[test]
    fn matches_primary_domain() {
        let matcher = matcher();
        assert_eq!(matcher.parse("user@auth10.com").unwrap().name(), "MyAD");
        assert_eq!(matcher.parse("user@auth0.com").unwrap().name(), "MyOtherAD");
    }

    #[test]
    fn matches_alias_domain() {
        let matcher = matcher();
        assert_eq!(matcher.parse("user@mydomain.com").unwrap().name(), "MyAD");
        assert_eq!(matcher.parse("user@otherdomain.com").unwrap().name(), "MyAD");
        assert_eq!(matcher.parse("user@auth0.io").unwrap().name(), "MyOtherAD");
    }

    #[test]
    fn unknown_domain_is_absent() {
        assert!(matcher().parse("user@unknown.tld").is_none());
    }

    #[test]
    fn first_candidate_wins() {
        let matcher = EnterpriseConnectionMatcher::new(vec![
            connection("first", "shared.com", &[]),
            connection("second", "shared.com", &[]),
        ]);
        assert_eq!(matcher.parse("a@shared.com").unwrap().name(), "first");
    }

    #[test]
    fn empty_candidate_list_never_matches() {
        let matcher = EnterpriseConnectionMatcher::new(Vec::new());
        assert!(matcher.parse("user@auth0.com").is_none());
        assert!(matcher.parse("nouser").is_none());
        assert!(matcher.parse("").is_none());
    }

    #[test]
    fn invalid_emails_are_absent() {
        let matcher = matcher();
        for input in ["auth0.com", "@auth0.com", "user@", "a@b@auth0.com", "us er@auth0.com", ""] {
            assert!(matcher.parse(input).is_none(), "input: {input:?}");
        }
    }

    #[test]
    fn case_sensitive_by_default() {
        assert!(matcher().parse("user@AUTH0.com").is_none());
    }

    #[test]
    fn case_insensitive_when_configured() {
        let matcher = EnterpriseConnectionMatcher::with_options(
            vec![connection("MyOtherAD", "auth0.com", &["Auth0.IO"])],
            MatchOptions {
                case_sensitive: false,
            },
        );
        assert_eq!(matcher.parse("user@AUTH0.com").unwrap().name(), "MyOtherAD");
        assert_eq!(matcher.parse("user@auth0.io").unwrap().name(), "MyOtherAD");
    }

    #[test]
    fn extracts_username() {
        assert_eq!(
            EnterpriseConnectionMatcher::extract_username("username@pep.com"),
            "username"
        );
        assert_eq!(EnterpriseConnectionMatcher::extract_username("nouser"), "nouser");
        assert_eq!(EnterpriseConnectionMatcher::extract_username("a@b@c"), "a");
    }

    #[test]
    fn domain_for_matched_connection() {
        let matcher = matcher();
        let matched = matcher.parse("user@auth0.io").unwrap();
        assert_eq!(
            EnterpriseConnectionMatcher::domain_for_connection(matched),
            Some("auth0.com")
        );
    }
}
