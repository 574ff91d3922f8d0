//! Redirect callback parameter extraction
//!
//! Identity providers hand tokens (implicit flow), codes (PKCE flow) and
//! errors back to the app in either the fragment or the query of the
//! redirect URI. Only one of the two is consulted: the fragment when it is
//! present and non-empty, otherwise the query.
//!
//! Parsing never fails. Segments without an `=` are dropped, and an
//! unparseable URI yields an empty set of parameters.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;
use url::Url;

/// Flat name → value mapping extracted from a redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParameters {
    values: HashMap<String, String>,
}

impl CallbackParameters {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for CallbackParameters {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Parse the parameters of a redirect URI.
///
/// `None` (no data delivered with the redirect) and strings that are not
/// absolute URIs both produce an empty mapping.
pub fn parse(uri: Option<&str>) -> CallbackParameters {
    let Some(uri) = uri else {
        return CallbackParameters::default();
    };
    match Url::parse(uri) {
        Ok(url) => parse_url(&url),
        Err(e) => {
            debug!(error = %e, "redirect is not an absolute URI, no parameters extracted");
            CallbackParameters::default()
        }
    }
}

/// Parse the parameters of an already-parsed URI.
pub fn parse_url(url: &Url) -> CallbackParameters {
    let source = url
        .fragment()
        .filter(|fragment| !fragment.is_empty())
        .or_else(|| url.query());
    source.map(parse_pairs).unwrap_or_default()
}

/// Split `a=1&b=2` on `&`, then each segment on its first `=`.
///
/// Segments with no `=` are skipped; `key=` keeps an empty value.
fn parse_pairs(raw: &str) -> CallbackParameters {
    raw.split('&')
        .filter_map(|segment| segment.split_once('='))
        .map(|(key, value)| (decode(key), decode(value)))
        .collect()
}

/// Percent-decode a component, keeping the raw text when it isn't valid UTF-8.
fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_owned())
}
