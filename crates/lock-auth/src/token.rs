//! Authorization code exchange
//!
//! The last leg of the PKCE flow: POST the code and verifier to the tenant's
//! token endpoint. The transport sits behind `TokenExchanger` so the
//! coordinator can be driven by a fake in tests; `HttpTokenClient` is the
//! reqwest-backed implementation.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::credentials::Credentials;
use crate::endpoints;
use crate::error::{Error, Result};

/// Parameters of one code-for-token exchange.
#[derive(Debug, Clone, Copy)]
pub struct CodeExchange<'a> {
    pub code: &'a str,
    pub code_verifier: &'a str,
    pub redirect_uri: &'a str,
}

/// Transport for the authorization-code grant.
///
/// Uses a boxed future so it stays dyn-compatible (`Arc<dyn TokenExchanger>`).
pub trait TokenExchanger: Send + Sync {
    fn exchange_code<'a>(
        &'a self,
        request: CodeExchange<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Credentials>> + Send + 'a>>;
}

/// Error body returned by the identity API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Form-encoded token endpoint client.
#[derive(Debug, Clone)]
pub struct HttpTokenClient {
    client: reqwest::Client,
    token_url: Url,
    client_id: String,
}

impl HttpTokenClient {
    pub fn new(client: reqwest::Client, tenant: &Url, client_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            token_url: endpoints::token_url(tenant)?,
            client_id: client_id.into(),
        })
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    async fn post_code(&self, request: CodeExchange<'_>) -> Result<Credentials> {
        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("code", request.code),
                ("code_verifier", request.code_verifier),
                ("redirect_uri", request.redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            warn!(%status, "token endpoint rejected code exchange");
            return Err(error_from_body(status.as_u16(), &body));
        }

        debug!(%status, "token endpoint accepted code exchange");
        response
            .json::<Credentials>()
            .await
            .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
    }
}

impl TokenExchanger for HttpTokenClient {
    fn exchange_code<'a>(
        &'a self,
        request: CodeExchange<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Credentials>> + Send + 'a>> {
        Box::pin(self.post_code(request))
    }
}

/// Turn a non-success token endpoint response into an error.
///
/// Only `error` and `error_description` are read from JSON bodies; anything
/// else is reported verbatim with the status.
fn error_from_body(status: u16, body: &str) -> Error {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(api) => Error::Api {
            description: api.error_description.unwrap_or_else(|| api.error.clone()),
            error: api.error,
        },
        Err(_) => Error::TokenExchange(format!("token endpoint returned {status}: {body}")),
    }
}
