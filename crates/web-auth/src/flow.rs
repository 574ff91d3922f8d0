//! Login attempt state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The coordinator executes the I/O implied by each action.
//!
//! ```text
//! Idle ──Started──▶ AwaitingRedirect ──redirect (implicit)──▶ Completed
//!                        │    └──redirect (code)──▶ ExchangingCode ──finished──▶ Completed
//!                        └──cancel / Canceled result──────────────────────────▶ Completed
//! ```
//!
//! Every path into `Completed` emits exactly one `FlowAction::Post`.

use lock_auth::callback;
use lock_auth::constants::{KEY_CODE, KEY_ERROR, KEY_STATE};
use lock_auth::{AuthCallbackResult, AuthFailure, Credentials, ErrorKind, PkceState};
use tracing::{debug, warn};

/// Identifies one `start` invocation on a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(pub u64);

/// Platform result status delivered with an activity result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    Canceled,
    Other(i32),
}

impl ResultCode {
    /// Map raw Android result codes (`RESULT_OK = -1`, `RESULT_CANCELED = 0`).
    pub fn from_raw(code: i32) -> Self {
        match code {
            -1 => ResultCode::Ok,
            0 => ResultCode::Canceled,
            other => ResultCode::Other(other),
        }
    }
}

/// Everything recorded at `start` that the redirect is checked against.
#[derive(Debug)]
pub struct PendingAttempt {
    pub attempt: AttemptId,
    /// Request code the embedded surface reports back with; `None` when the
    /// attempt was launched in a browser and returns via deep link.
    pub request_code: Option<i32>,
    /// Value sent as the `state` parameter.
    pub state: String,
    /// Present when the attempt uses the authorization-code + PKCE flow.
    pub pkce: Option<PkceState>,
}

#[derive(Debug)]
pub enum FlowState {
    Idle,
    AwaitingRedirect(PendingAttempt),
    ExchangingCode {
        attempt: AttemptId,
    },
    Completed {
        attempt: AttemptId,
        outcome: &'static str,
    },
}

/// Coarse view of `FlowState` for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    AwaitingRedirect,
    ExchangingCode,
    Completed,
}

impl FlowState {
    pub fn phase(&self) -> FlowPhase {
        match self {
            FlowState::Idle => FlowPhase::Idle,
            FlowState::AwaitingRedirect(_) => FlowPhase::AwaitingRedirect,
            FlowState::ExchangingCode { .. } => FlowPhase::ExchangingCode,
            FlowState::Completed { .. } => FlowPhase::Completed,
        }
    }

    /// Whether an attempt is still waiting for its terminal result.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            FlowState::AwaitingRedirect(_) | FlowState::ExchangingCode { .. }
        )
    }
}

#[derive(Debug)]
pub enum FlowEvent {
    /// Authorize URI launched successfully.
    Started(PendingAttempt),
    /// Attempt could not be launched.
    StartFailed {
        attempt: AttemptId,
        failure: AuthFailure,
    },
    /// Redirect arrived. `request_code` is `None` for deep links.
    Redirect {
        request_code: Option<i32>,
        result_code: ResultCode,
        data: Option<String>,
    },
    /// Token exchange for `attempt` finished on the worker task.
    ExchangeFinished {
        attempt: AttemptId,
        result: lock_auth::Result<Credentials>,
    },
    Cancel,
}

#[derive(Debug)]
pub enum FlowAction {
    /// Deliver the terminal result to the application.
    Post(AuthCallbackResult),
    /// Trade `code` for tokens with the attempt's verifier.
    ExchangeCode {
        attempt: AttemptId,
        pkce: PkceState,
        code: String,
    },
    /// Event consumed, nothing to execute.
    None,
    /// Event did not belong to the current attempt.
    Ignore,
}

fn complete(attempt: AttemptId, result: AuthCallbackResult) -> (FlowState, FlowAction) {
    (
        FlowState::Completed {
            attempt,
            outcome: result.outcome(),
        },
        FlowAction::Post(result),
    )
}

fn fail(attempt: AttemptId, failure: AuthFailure) -> (FlowState, FlowAction) {
    complete(attempt, AuthCallbackResult::Error(failure))
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: FlowState, event: FlowEvent) -> (FlowState, FlowAction) {
    match (state, event) {
        // --- Starting: only from a state with nothing pending ---
        (state, FlowEvent::Started(pending)) if !state.is_pending() => {
            (FlowState::AwaitingRedirect(pending), FlowAction::None)
        }

        (state, FlowEvent::StartFailed { attempt, failure }) if !state.is_pending() => {
            fail(attempt, failure)
        }

        // --- AwaitingRedirect ---
        (
            FlowState::AwaitingRedirect(pending),
            FlowEvent::Redirect {
                request_code,
                result_code,
                data,
            },
        ) => {
            if pending.request_code != request_code {
                debug!(
                    expected = ?pending.request_code,
                    received = ?request_code,
                    "redirect does not belong to the pending attempt"
                );
                return (FlowState::AwaitingRedirect(pending), FlowAction::Ignore);
            }
            match result_code {
                ResultCode::Ok => on_redirect_data(pending, data.as_deref()),
                ResultCode::Canceled => complete(pending.attempt, AuthCallbackResult::Cancelled),
                ResultCode::Other(code) => {
                    warn!(result_code = code, "unexpected result code for login redirect");
                    (FlowState::AwaitingRedirect(pending), FlowAction::Ignore)
                }
            }
        }

        (FlowState::AwaitingRedirect(pending), FlowEvent::Cancel) => {
            complete(pending.attempt, AuthCallbackResult::Cancelled)
        }

        // --- ExchangingCode ---
        (
            FlowState::ExchangingCode { attempt },
            FlowEvent::ExchangeFinished {
                attempt: finished,
                result,
            },
        ) if attempt == finished => match result {
            Ok(credentials) => complete(attempt, AuthCallbackResult::Success(credentials)),
            Err(e) => fail(attempt, AuthFailure::from_exchange_error(e)),
        },

        (FlowState::ExchangingCode { attempt }, FlowEvent::Cancel) => {
            complete(attempt, AuthCallbackResult::Cancelled)
        }

        // --- Stale exchange results are dropped ---
        (state, FlowEvent::ExchangeFinished { attempt, .. }) => {
            debug!(attempt = attempt.0, "discarding exchange result for a finished attempt");
            (state, FlowAction::Ignore)
        }

        // --- Redirects with nothing pending ---
        (state, FlowEvent::Redirect { .. }) => (state, FlowAction::Ignore),

        // --- Cancel when idle/completed, or start while pending: no-op ---
        (state, _event) => (state, FlowAction::None),
    }
}

/// Validate the parameters of a matched, successful redirect.
///
/// Checks run in order: provider `error`, `state` mismatch, no parameters,
/// then success (implicit) or code exchange (PKCE).
fn on_redirect_data(pending: PendingAttempt, data: Option<&str>) -> (FlowState, FlowAction) {
    let attempt = pending.attempt;
    let values = callback::parse(data);

    if let Some(error) = values.get(KEY_ERROR) {
        warn!(attempt = attempt.0, error, "identity provider returned an error");
        return fail(attempt, AuthFailure::from_callback_error(error));
    }

    if let Some(state) = values.get(KEY_STATE)
        && state != pending.state
    {
        warn!(attempt = attempt.0, "redirect state does not match the one sent");
        return fail(attempt, AuthFailure::new(ErrorKind::InvalidState));
    }

    if values.is_empty() {
        warn!(attempt = attempt.0, "redirect carried no parameters");
        return fail(attempt, AuthFailure::new(ErrorKind::UnexpectedCallback));
    }

    match pending.pkce {
        Some(pkce) => match values.get(KEY_CODE) {
            Some(code) => (
                FlowState::ExchangingCode { attempt },
                FlowAction::ExchangeCode {
                    attempt,
                    pkce,
                    code: code.to_owned(),
                },
            ),
            None => {
                warn!(attempt = attempt.0, "code flow redirect has no authorization code");
                fail(attempt, AuthFailure::new(ErrorKind::UnexpectedCallback))
            }
        },
        None => {
            debug!(attempt = attempt.0, "authenticated using implicit web flow");
            complete(
                attempt,
                AuthCallbackResult::Success(Credentials::from_parameters(&values)),
            )
        }
    }
}
