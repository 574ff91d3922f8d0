//! Redirect login coordinator
//!
//! Owns the flow state, the launcher and the result channel. Every public
//! method turns its input into a `FlowEvent`, runs it through
//! `flow::handle_event` and executes the returned action.
//!
//! All methods are called from the owning task. The only cross-task hop is
//! the PKCE code exchange: it runs on a spawned task that enqueues its
//! completion into the coordinator's inbox, and `pump()` applies it back on
//! the owning task. Results are delivered on the channel returned by `new`.

use std::collections::BTreeMap;
use std::sync::Arc;

use lock_auth::constants::{
    KEY_CLIENT_ID, KEY_CLIENT_INFO, KEY_CODE_CHALLENGE, KEY_CODE_CHALLENGE_METHOD, KEY_CONNECTION,
    KEY_LOGIN_HINT, KEY_REDIRECT_URI, KEY_RESPONSE_TYPE, KEY_SCOPE, KEY_STATE, METHOD_SHA_256,
    RESPONSE_TYPE_CODE, RESPONSE_TYPE_TOKEN, SCOPE_OPENID,
};
use lock_auth::{
    AuthCallbackResult, AuthFailure, EnterpriseConnectionMatcher, ErrorKind, PkceState,
    TokenExchanger, endpoints,
};
use provider::{AuthRequest, AuthResolver, LaunchMode};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::flow::{
    AttemptId, FlowAction, FlowEvent, FlowPhase, FlowState, PendingAttempt, ResultCode,
    handle_event,
};
use crate::launcher::Launcher;
use crate::metrics;

/// Request code used for embedded attempts unless configured otherwise.
pub const DEFAULT_REQUEST_CODE: i32 = 110;

/// Static settings shared by every attempt of one coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub client_id: String,
    /// Tenant base URL; /authorize is resolved against it.
    pub tenant: Url,
    pub redirect_uri: Url,
    pub scope: String,
    pub launch_mode: LaunchMode,
    /// Request code for embedded attempts.
    pub request_code: i32,
    /// Use authorization code + PKCE when a token exchanger is configured.
    pub use_pkce: bool,
    /// Value of the `auth0Client` telemetry parameter.
    pub client_info: Option<String>,
}

impl CoordinatorConfig {
    pub fn new(client_id: impl Into<String>, tenant: Url, redirect_uri: Url) -> Self {
        Self {
            client_id: client_id.into(),
            tenant,
            redirect_uri,
            scope: SCOPE_OPENID.to_owned(),
            launch_mode: LaunchMode::Browser,
            request_code: DEFAULT_REQUEST_CODE,
            use_pkce: true,
            client_info: None,
        }
    }
}

pub struct RedirectAuthCoordinator {
    config: CoordinatorConfig,
    launcher: Box<dyn Launcher>,
    resolver: AuthResolver,
    exchanger: Option<Arc<dyn TokenExchanger>>,
    /// Runtime code exchanges are spawned on.
    runtime: Option<Handle>,
    state: FlowState,
    next_attempt: u64,
    results: mpsc::UnboundedSender<AuthCallbackResult>,
    inbox_tx: mpsc::UnboundedSender<FlowEvent>,
    inbox_rx: mpsc::UnboundedReceiver<FlowEvent>,
    /// Exchanges spawned whose completion has not been pumped yet.
    in_flight: usize,
}

impl RedirectAuthCoordinator {
    /// Create a coordinator and the receiver its results are posted to.
    pub fn new(
        config: CoordinatorConfig,
        launcher: Box<dyn Launcher>,
    ) -> (Self, mpsc::UnboundedReceiver<AuthCallbackResult>) {
        let (results, results_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            config,
            launcher,
            resolver: AuthResolver::default(),
            exchanger: None,
            runtime: Handle::try_current().ok(),
            state: FlowState::Idle,
            next_attempt: 0,
            results,
            inbox_tx,
            inbox_rx,
            in_flight: 0,
        };
        (coordinator, results_rx)
    }

    pub fn with_resolver(mut self, resolver: AuthResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Enables the code flow. Without an exchanger every attempt uses the
    /// implicit flow.
    ///
    /// Exchanges run on the runtime current at this call (or at `new`). A
    /// coordinator with no runtime fails code exchanges with a transport
    /// error.
    pub fn with_token_exchanger(mut self, exchanger: Arc<dyn TokenExchanger>) -> Self {
        self.exchanger = Some(exchanger);
        if let Ok(handle) = Handle::try_current() {
            self.runtime = Some(handle);
        }
        self
    }

    /// Spawn code exchanges on `handle` instead of the current runtime.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn phase(&self) -> FlowPhase {
        self.state.phase()
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// How the attempt awaiting its redirect was launched, and so which
    /// entry point its redirect arrives on.
    pub fn awaiting_launch_mode(&self) -> Option<LaunchMode> {
        match &self.state {
            FlowState::AwaitingRedirect(pending) => Some(match pending.request_code {
                Some(_) => LaunchMode::Embedded,
                None => LaunchMode::Browser,
            }),
            _ => None,
        }
    }

    /// Start a login attempt.
    ///
    /// Returns `FlowInProgress` if an attempt is still pending. Any other
    /// failure (provider refusal, unbuildable URI, launcher error) is posted
    /// to the result channel as the attempt's terminal result.
    pub fn start(&mut self, request: AuthRequest) -> Result<AttemptId> {
        if self.state.is_pending() {
            warn!("start called while a login attempt is pending");
            return Err(Error::FlowInProgress);
        }
        self.next_attempt += 1;
        let attempt = AttemptId(self.next_attempt);
        let mut request = request;

        if let Some(connection) = request.connection.clone()
            && let Some(provider) = self
                .resolver
                .provider_for(request.strategy.as_deref(), &connection)
            && let Err(e) = provider.prepare(&mut request)
        {
            warn!(attempt = attempt.0, provider = provider.id(), error = %e, "provider refused login");
            self.fail_start(
                attempt,
                AuthFailure::new(ErrorKind::InvalidConfiguration).with_cause(e),
            );
            return Ok(attempt);
        }

        let mode = request.launch_mode.unwrap_or(self.config.launch_mode);
        let pkce = self.new_pkce_state();
        let state = Uuid::new_v4().to_string();

        let uri = match self.authorize_uri(&request, &state, pkce.as_ref()) {
            Ok(uri) => uri,
            Err(e) => {
                warn!(attempt = attempt.0, error = %e, "cannot build authorize URI");
                self.fail_start(
                    attempt,
                    AuthFailure::new(ErrorKind::InvalidConfiguration).with_cause(e),
                );
                return Ok(attempt);
            }
        };

        let (launched, request_code, mode_label) = match mode {
            LaunchMode::Browser => (self.launcher.open_browser(&uri), None, "browser"),
            LaunchMode::Embedded => (
                self.launcher.open_embedded(
                    &uri,
                    self.config.request_code,
                    request.connection.as_deref(),
                ),
                Some(self.config.request_code),
                "embedded",
            ),
        };
        if let Err(e) = launched {
            warn!(attempt = attempt.0, mode = mode_label, error = %e, "launcher failed");
            self.fail_start(
                attempt,
                AuthFailure::new(ErrorKind::ProviderError).with_cause(e),
            );
            return Ok(attempt);
        }

        info!(
            attempt = attempt.0,
            mode = mode_label,
            connection = request.connection.as_deref().unwrap_or("<hosted>"),
            pkce = pkce.is_some(),
            "login attempt started"
        );
        metrics::record_flow_started(mode_label);
        let action = self.apply(FlowEvent::Started(PendingAttempt {
            attempt,
            request_code,
            state,
            pkce,
        }));
        self.execute(action);
        Ok(attempt)
    }

    /// Activity-result entry point for embedded attempts.
    ///
    /// Returns false when the redirect does not belong to the pending
    /// attempt; the attempt is left untouched in that case.
    pub fn on_redirect(
        &mut self,
        request_code: i32,
        result_code: ResultCode,
        data: Option<&str>,
    ) -> bool {
        self.redirect(FlowEvent::Redirect {
            request_code: Some(request_code),
            result_code,
            data: data.map(str::to_owned),
        })
    }

    /// Deep-link entry point for browser attempts.
    pub fn on_deep_link(&mut self, uri: &str) -> bool {
        self.redirect(FlowEvent::Redirect {
            request_code: None,
            result_code: ResultCode::Ok,
            data: Some(uri.to_owned()),
        })
    }

    /// Cancel the pending attempt. Returns true if `Cancelled` was posted;
    /// a no-op once the attempt has a terminal result.
    pub fn cancel(&mut self) -> bool {
        let action = self.apply(FlowEvent::Cancel);
        self.execute(action)
    }

    /// Apply the next completed code exchange.
    ///
    /// Waits for one spawned exchange to finish and returns true if that
    /// posted a terminal result. Returns false immediately when no exchange
    /// is in flight; completions for cancelled attempts are discarded.
    pub async fn pump(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        let Some(event) = self.inbox_rx.recv().await else {
            return false;
        };
        self.in_flight -= 1;
        let action = self.apply(event);
        self.execute(action)
    }

    fn redirect(&mut self, event: FlowEvent) -> bool {
        let action = self.apply(event);
        if matches!(action, FlowAction::Ignore) {
            metrics::record_redirect_ignored();
            return false;
        }
        self.execute(action);
        true
    }

    fn fail_start(&mut self, attempt: AttemptId, failure: AuthFailure) {
        let action = self.apply(FlowEvent::StartFailed { attempt, failure });
        self.execute(action);
    }

    fn new_pkce_state(&self) -> Option<PkceState> {
        if !self.config.use_pkce || self.exchanger.is_none() {
            return None;
        }
        if !lock_auth::is_available() {
            warn!("PKCE unavailable, falling back to implicit flow");
            return None;
        }
        match PkceState::new(self.config.redirect_uri.as_str()) {
            Ok(pkce) => Some(pkce),
            Err(e) => {
                warn!(error = %e, "PKCE unavailable, falling back to implicit flow");
                None
            }
        }
    }

    fn authorize_uri(
        &self,
        request: &AuthRequest,
        state: &str,
        pkce: Option<&PkceState>,
    ) -> lock_auth::Result<Url> {
        let mut params: BTreeMap<&str, &str> = BTreeMap::new();
        params.insert(KEY_SCOPE, &self.config.scope);
        for (key, value) in &request.parameters {
            params.insert(key, value);
        }
        if let Some(info) = &self.config.client_info {
            params.insert(KEY_CLIENT_INFO, info);
        }

        match pkce {
            Some(pkce) => {
                params.insert(KEY_RESPONSE_TYPE, RESPONSE_TYPE_CODE);
                params.insert(KEY_CODE_CHALLENGE, pkce.code_challenge());
                params.insert(KEY_CODE_CHALLENGE_METHOD, METHOD_SHA_256);
            }
            None => {
                params.insert(KEY_RESPONSE_TYPE, RESPONSE_TYPE_TOKEN);
                params.remove(KEY_CODE_CHALLENGE);
                params.remove(KEY_CODE_CHALLENGE_METHOD);
            }
        }
        params.insert(KEY_STATE, state);
        params.insert(KEY_CLIENT_ID, &self.config.client_id);
        params.insert(KEY_REDIRECT_URI, self.config.redirect_uri.as_str());
        match &request.connection {
            Some(connection) => {
                params.insert(KEY_CONNECTION, connection);
            }
            None => {
                params.remove(KEY_CONNECTION);
            }
        }
        if let Some(identity) = request.identity.as_deref()
            && !identity.is_empty()
        {
            params.insert(
                KEY_LOGIN_HINT,
                EnterpriseConnectionMatcher::extract_username(identity),
            );
        }

        let mut uri = endpoints::authorize_url(&self.config.tenant)?;
        uri.query_pairs_mut().clear().extend_pairs(params);
        debug!(host = uri.host_str(), path = uri.path(), "built authorize URI");
        Ok(uri)
    }

    fn apply(&mut self, event: FlowEvent) -> FlowAction {
        let state = std::mem::replace(&mut self.state, FlowState::Idle);
        let (next, action) = handle_event(state, event);
        self.state = next;
        action
    }

    /// Execute an action. Returns true if a terminal result was posted.
    fn execute(&mut self, action: FlowAction) -> bool {
        match action {
            FlowAction::Post(result) => {
                let outcome = result.outcome();
                info!(outcome, "login attempt finished");
                metrics::record_flow_completed(outcome);
                if self.results.send(result).is_err() {
                    warn!(outcome, "result receiver dropped, discarding login result");
                }
                true
            }
            FlowAction::ExchangeCode {
                attempt,
                pkce,
                code,
            } => {
                let failure = match (self.exchanger.clone(), self.runtime.clone()) {
                    (Some(exchanger), Some(runtime)) => {
                        debug!(attempt = attempt.0, "spawning code exchange");
                        self.in_flight += 1;
                        let inbox = self.inbox_tx.clone();
                        pkce.exchange_with_callback(&runtime, exchanger, code, move |result| {
                            let _ = inbox.send(FlowEvent::ExchangeFinished { attempt, result });
                        });
                        return false;
                    }
                    (None, _) => {
                        lock_auth::Error::TokenExchange("no token exchanger configured".into())
                    }
                    (Some(_), None) => {
                        warn!(attempt = attempt.0, "no async runtime for the code exchange");
                        lock_auth::Error::Http("no async runtime available".into())
                    }
                };
                let action = self.apply(FlowEvent::ExchangeFinished {
                    attempt,
                    result: Err(failure),
                });
                self.execute(action)
            }
            FlowAction::None | FlowAction::Ignore => false,
        }
    }
}
