//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! A `PkceState` is created when an authorization-code flow starts and is
//! consumed by value when the code is exchanged, so a verifier can only ever
//! be sent once and only for the attempt that generated it. It is never
//! persisted.

use std::sync::{Arc, OnceLock};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use common::Secret;
use rand::RngExt;
use sha2::{Digest, Sha256};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::token::{CodeExchange, TokenExchanger};

/// Random bytes behind a verifier; 32 bytes encode to 43 characters.
const VERIFIER_BYTES: usize = 32;

const MIN_VERIFIER_LEN: usize = 43;
const MAX_VERIFIER_LEN: usize = 128;

/// RFC 7636 appendix B test vector, used as the runtime self-check.
const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

/// Generate a cryptographically random PKCE code verifier.
///
/// 32 bytes from the thread-local CSPRNG, URL-safe base64 without padding.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(ASCII(verifier)))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Whether the digest and encoding PKCE needs behave correctly here.
///
/// Runs the RFC test vector once and caches the answer. Callers fall back
/// to the implicit flow when this is false.
pub fn is_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        let ok = compute_challenge(RFC_VERIFIER) == RFC_CHALLENGE;
        if !ok {
            warn!("S256 self-check failed, PKCE disabled");
        }
        ok
    })
}

/// One-time verifier/challenge pair for a single authorization attempt.
#[derive(Debug)]
pub struct PkceState {
    verifier: Secret<String>,
    challenge: String,
    redirect_uri: String,
}

impl PkceState {
    /// Create a fresh state bound to the redirect URI used on /authorize.
    pub fn new(redirect_uri: impl Into<String>) -> Result<Self> {
        if !is_available() {
            return Err(Error::PkceUnavailable(
                "SHA-256 code challenge cannot be computed".into(),
            ));
        }
        Self::with_verifier(generate_verifier(), redirect_uri)
    }

    /// Create a state from a known verifier.
    ///
    /// The verifier must be 43-128 characters from the RFC 7636 unreserved
    /// set (`A-Z a-z 0-9 - . _ ~`).
    pub fn with_verifier(verifier: impl Into<String>, redirect_uri: impl Into<String>) -> Result<Self> {
        let verifier = verifier.into();
        if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&verifier.len()) {
            return Err(Error::InvalidInput(format!(
                "code verifier must be {MIN_VERIFIER_LEN}-{MAX_VERIFIER_LEN} characters, got {}",
                verifier.len()
            )));
        }
        if !verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        {
            return Err(Error::InvalidInput(
                "code verifier contains characters outside the unreserved set".into(),
            ));
        }
        let challenge = compute_challenge(&verifier);
        Ok(Self {
            verifier: Secret::new(verifier),
            challenge,
            redirect_uri: redirect_uri.into(),
        })
    }

    pub fn code_challenge(&self) -> &str {
        &self.challenge
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Exchange the authorization code for tokens using this state's verifier.
    ///
    /// Consumes the state: the verifier cannot be replayed.
    pub async fn exchange_code_for_token(
        self,
        exchanger: &dyn TokenExchanger,
        authorization_code: &str,
    ) -> Result<Credentials> {
        debug!(code_len = authorization_code.len(), "exchanging authorization code");
        let request = CodeExchange {
            code: authorization_code,
            code_verifier: self.verifier.expose(),
            redirect_uri: &self.redirect_uri,
        };
        exchanger.exchange_code(request).await
    }

    /// Run the exchange on `runtime` and hand the outcome to `callback`.
    ///
    /// The callback runs on a spawned task exactly once, also when the
    /// exchange task panics or is cancelled. Callers that must observe the
    /// result on their own task should only enqueue from it.
    pub fn exchange_with_callback<F>(
        self,
        runtime: &Handle,
        exchanger: Arc<dyn TokenExchanger>,
        authorization_code: String,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<Credentials>) + Send + 'static,
    {
        let exchange = runtime.spawn(async move {
            self.exchange_code_for_token(exchanger.as_ref(), &authorization_code)
                .await
        });
        runtime.spawn(async move {
            let result = match exchange.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "code exchange task did not complete");
                    Err(Error::TokenExchange(format!("code exchange task failed: {e}")))
                }
            };
            callback(result);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    #[test]
    fn verifier_is_url_safe_base64() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), 43);
        assert!(
            verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "verifier must be URL-safe base64 (no padding): {verifier}"
        );
        assert!(!verifier.contains(['=', '+', '/']));
    }

    #[test]
    fn verifiers_are_unique() {
        let a = generate_verifier();
        let b = generate_verifier();
        assert_ne!(a, b, "two verifiers must not collide");
    }

    #[test]
    fn challenge_matches_rfc_vector() {
        assert_eq!(compute_challenge(RFC_VERIFIER), RFC_CHALLENGE);
        assert_eq!(
            compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn challenge_is_deterministic() {
        let verifier = generate_verifier();
        assert_eq!(compute_challenge(&verifier), compute_challenge(&verifier));
    }

    #[test]
    fn challenge_decodes_to_sha256_length() {
        let challenge = compute_challenge(&generate_verifier());
        let decoded = URL_SAFE_NO_PAD.decode(&challenge).expect("valid base64url");
        assert_eq!(decoded.len(), 32, "SHA-256 hash must be 32 bytes");
    }

    #[test]
    fn available_on_this_platform() {
        assert!(is_available());
    }

    #[test]
    fn state_exposes_matching_challenge() {
        let state = PkceState::with_verifier(RFC_VERIFIER, "https://t.example.com/cb").unwrap();
        assert_eq!(state.code_challenge(), RFC_CHALLENGE);
        assert_eq!(state.redirect_uri(), "https://t.example.com/cb");
    }

    #[test]
    fn fresh_states_have_distinct_challenges() {
        let a = PkceState::new("https://t.example.com/cb").unwrap();
        let b = PkceState::new("https://t.example.com/cb").unwrap();
        assert_ne!(a.code_challenge(), b.code_challenge());
    }

    #[test]
    fn state_debug_hides_verifier() {
        let state = PkceState::with_verifier(RFC_VERIFIER, "https://t.example.com/cb").unwrap();
        let debug = format!("{state:?}");
        assert!(!debug.contains(RFC_VERIFIER), "got: {debug}");
    }

    #[test]
    fn rejects_short_and_invalid_verifiers() {
        assert!(PkceState::with_verifier("short", "x").is_err());
        assert!(PkceState::with_verifier("a".repeat(129), "x").is_err());
        let bad = format!("{}+/", "a".repeat(43));
        assert!(PkceState::with_verifier(bad, "x").is_err());
        assert!(PkceState::with_verifier("a".repeat(128), "x").is_ok());
    }

    /// Records every exchange request it receives.
    #[derive(Default)]
    struct RecordingExchanger {
        seen: Mutex<Vec<(String, String, String)>>,
    }

    impl TokenExchanger for RecordingExchanger {
        fn exchange_code<'a>(
            &'a self,
            request: CodeExchange<'a>,
        ) -> Pin<Box<dyn Future<Output = Result<Credentials>> + Send + 'a>> {
            self.seen.lock().unwrap().push((
                request.code.to_owned(),
                request.code_verifier.to_owned(),
                request.redirect_uri.to_owned(),
            ));
            Box::pin(async {
                Ok(Credentials {
                    access_token: Some("at".into()),
                    ..Credentials::default()
                })
            })
        }
    }

    #[tokio::test]
    async fn exchange_sends_own_verifier_and_redirect() {
        let exchanger = RecordingExchanger::default();
        let state = PkceState::with_verifier(RFC_VERIFIER, "https://t.example.com/cb").unwrap();

        let credentials = state
            .exchange_code_for_token(&exchanger, "auth-code")
            .await
            .unwrap();
        assert_eq!(credentials.access_token.unwrap().expose(), "at");

        let seen = exchanger.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "auth-code");
        assert_eq!(seen[0].1, RFC_VERIFIER);
        assert_eq!(seen[0].2, "https://t.example.com/cb");
    }

    #[tokio::test]
    async fn exchanges_never_share_verifiers() {
        let exchanger = RecordingExchanger::default();
        let a = PkceState::new("https://t.example.com/cb").unwrap();
        let b = PkceState::new("https://t.example.com/cb").unwrap();
        a.exchange_code_for_token(&exchanger, "code-a").await.unwrap();
        b.exchange_code_for_token(&exchanger, "code-b").await.unwrap();

        let seen = exchanger.seen.lock().unwrap();
        assert_ne!(seen[0].1, seen[1].1);
    }

    #[tokio::test]
    async fn callback_receives_exchange_result() {
        let exchanger: Arc<dyn TokenExchanger> = Arc::new(RecordingExchanger::default());
        let state = PkceState::new("https://t.example.com/cb").unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        state
            .exchange_with_callback(&Handle::current(), exchanger, "auth-code".into(), move |result| {
                let _ = tx.send(result.is_ok());
            })
            .await
            .unwrap();

        assert!(rx.await.unwrap());
    }

    struct PanickingExchanger;

    impl TokenExchanger for PanickingExchanger {
        fn exchange_code<'a>(
            &'a self,
            _request: CodeExchange<'a>,
        ) -> Pin<Box<dyn Future<Output = Result<Credentials>> + Send + 'a>> {
            Box::pin(async { panic!("token endpoint client crashed") })
        }
    }

    #[tokio::test]
    async fn callback_runs_when_exchange_task_panics() {
        let state = PkceState::new("https://t.example.com/cb").unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        state
            .exchange_with_callback(
                &Handle::current(),
                Arc::new(PanickingExchanger),
                "auth-code".into(),
                move |result| {
                    let _ = tx.send(result);
                },
            )
            .await
            .unwrap();

        assert!(matches!(rx.await.unwrap(), Err(Error::TokenExchange(_))));
    }
}
