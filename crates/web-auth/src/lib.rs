//! Redirect-based login coordination
//!
//! Drives one OAuth login at a time through an external browser or an
//! embedded web surface:
//!
//! 1. `start()` builds the /authorize URI and hands it to the `Launcher`
//! 2. The redirect comes back via `on_redirect()` (activity result) or
//!    `on_deep_link()` (browser)
//! 3. Parameters are validated; implicit-flow tokens are posted directly,
//!    PKCE codes are exchanged on a spawned task and the completion is
//!    applied by `pump()` on the owning task
//! 4. Exactly one `AuthCallbackResult` per attempt lands on the result channel
//!
//! The transition rules live in `flow`, a pure state machine; the coordinator
//! only executes the actions it returns.

pub mod coordinator;
pub mod error;
pub mod flow;
pub mod launcher;
pub mod metrics;

pub use coordinator::{CoordinatorConfig, DEFAULT_REQUEST_CODE, RedirectAuthCoordinator};
pub use error::{Error, Result};
pub use flow::{AttemptId, FlowPhase, ResultCode};
pub use launcher::Launcher;
