//! Tenant endpoint URLs
//!
//! The tenant domain may be configured as a bare host (`tenant.example.com`)
//! or a full URL. Everything is normalized to an absolute base URL with a
//! trailing slash so relative joins never drop a path segment.

use url::Url;

use crate::constants::{AUTHORIZE_PATH, TOKEN_PATH};
use crate::error::{Error, Result};

/// Normalize a configured tenant domain into a base URL.
pub fn tenant_url(domain: &str) -> Result<Url> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(Error::InvalidInput("tenant domain is empty".into()));
    }
    let with_scheme = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_owned()
    } else {
        format!("https://{domain}")
    };
    let mut url = Url::parse(&with_scheme)
        .map_err(|e| Error::InvalidInput(format!("invalid tenant domain {domain}: {e}")))?;
    if url.host_str().is_none() {
        return Err(Error::InvalidInput(format!("tenant domain {domain} has no host")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

pub fn authorize_url(tenant: &Url) -> Result<Url> {
    join(tenant, AUTHORIZE_PATH)
}

pub fn token_url(tenant: &Url) -> Result<Url> {
    join(tenant, TOKEN_PATH)
}

/// App-link callback registered for an Android package:
/// `{tenant}/android/{package}/callback`.
pub fn callback_uri(tenant: &Url, package_name: &str) -> Result<Url> {
    join(tenant, &format!("android/{package_name}/callback"))
}

fn join(tenant: &Url, path: &str) -> Result<Url> {
    tenant
        .join(path)
        .map_err(|e| Error::InvalidInput(format!("cannot build {path} endpoint: {e}")))
}
