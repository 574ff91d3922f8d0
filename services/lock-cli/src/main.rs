//! Lock login CLI
//!
//! Drives one redirect-based login from a terminal:
//! 1. Loads the tenant/flow config and resolves the connection
//!    (explicit `--connection`, or the enterprise connection claiming the
//!    `--identity` email domain)
//! 2. Prints the authorize URI and reads the redirect back from stdin
//! 3. Exchanges the code (PKCE) or reads implicit tokens
//! 4. Prints the credentials as JSON, or fails with the login error
//!
//! `--magic-link <uri>` only parses a passwordless app link and prints its code.

mod config;
mod launcher;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use lock_auth::{
    AuthCallbackResult, AuthFailure, EnterpriseConnectionMatcher, ErrorKind, HttpTokenClient,
    MagicLinkMode, parse_magic_link,
};
use provider::{AuthRequest, AuthResolver, ConfiguredHandler, LaunchMode};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web_auth::{FlowPhase, RedirectAuthCoordinator, ResultCode};

use crate::config::Config;
use crate::launcher::TerminalLauncher;

/// Parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<String>,
    connection: Option<String>,
    identity: Option<String>,
    magic_link: Option<String>,
    print_metrics: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let slot = match arg.as_str() {
                "--config" => &mut parsed.config,
                "--connection" => &mut parsed.connection,
                "--identity" => &mut parsed.identity,
                "--magic-link" => &mut parsed.magic_link,
                "--print-metrics" => {
                    parsed.print_metrics = true;
                    continue;
                }
                other => anyhow::bail!("unknown argument: {other}"),
            };
            let value = args
                .next()
                .with_context(|| format!("{arg} requires a value"))?;
            *slot = Some(value);
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the prompts and the result
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse(std::env::args().skip(1))?;

    if let Some(link) = &args.magic_link {
        return print_magic_link(link);
    }

    let prometheus = if args.print_metrics {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        domain = %config.account.domain,
        use_browser = config.flow.use_browser,
        pkce = config.flow.pkce,
        connections = config.connections.len(),
        providers = config.providers.len(),
        "configuration loaded"
    );

    let matcher =
        EnterpriseConnectionMatcher::with_options(config.connections()?, config.match_options());
    let request = match build_request(&matcher, &args) {
        Ok(request) => request,
        Err(failure) => return report(AuthCallbackResult::Error(failure)),
    };

    let exchanger = HttpTokenClient::new(
        reqwest::Client::new(),
        &config.tenant()?,
        config.account.client_id.clone(),
    )?;
    let resolver = AuthResolver::default()
        .with_handler(Arc::new(ConfiguredHandler::new(config.providers.clone())?));

    let (coordinator, mut results) = RedirectAuthCoordinator::new(
        config.coordinator_config()?,
        Box::new(TerminalLauncher::new(std::io::stdout())),
    );
    let mut coordinator = coordinator
        .with_resolver(resolver)
        .with_token_exchanger(Arc::new(exchanger));

    coordinator.start(request)?;
    drive(&mut coordinator).await?;

    let result = results
        .try_recv()
        .context("login finished without a result")?;

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }

    report(result)
}

/// Pick the connection for this login.
///
/// An explicit connection wins. Otherwise an identity must be an email
/// claimed by a configured enterprise connection. With neither, the hosted
/// login page is used.
fn build_request(
    matcher: &EnterpriseConnectionMatcher,
    args: &Args,
) -> std::result::Result<AuthRequest, AuthFailure> {
    let mut request = AuthRequest::default();
    if let Some(identity) = &args.identity {
        request = request.with_identity(identity.clone());
    }

    match (&args.connection, &args.identity) {
        (Some(name), _) => {
            request.connection = Some(name.clone());
            request.strategy = matcher
                .connections()
                .iter()
                .find(|c| c.name() == name)
                .map(|c| c.strategy().to_owned());
        }
        (None, Some(identity)) => {
            let Some(connection) = matcher.parse(identity) else {
                let kind = if identity.contains('@') {
                    ErrorKind::NoMatchingConnection
                } else {
                    ErrorKind::InvalidInput
                };
                warn!(kind = kind.as_str(), "no enterprise connection for identity");
                return Err(AuthFailure::new(kind));
            };
            info!(
                connection = connection.name(),
                domain = EnterpriseConnectionMatcher::domain_for_connection(connection),
                "matched enterprise connection"
            );
            request.connection = Some(connection.name().to_owned());
            request.strategy = Some(connection.strategy().to_owned());
        }
        (None, None) => info!("no connection selected, using hosted login page"),
    }
    Ok(request)
}

/// Feed stdin lines to the coordinator until the attempt has a result.
///
/// An empty line, EOF or Ctrl-C cancels.
async fn drive(coordinator: &mut RedirectAuthCoordinator) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while coordinator.is_pending() {
        if coordinator.phase() == FlowPhase::ExchangingCode {
            let interrupted = tokio::select! {
                _ = coordinator.pump() => false,
                _ = tokio::signal::ctrl_c() => true,
            };
            if interrupted {
                coordinator.cancel();
            }
            continue;
        }

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read redirect from stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        match line.as_deref().map(str::trim) {
            None | Some("") => {
                coordinator.cancel();
            }
            Some(redirect) => {
                if !feed_redirect(coordinator, redirect) {
                    warn!("redirect was not accepted, paste the callback URL again");
                }
            }
        }
    }
    Ok(())
}

/// Deliver a pasted redirect on the entry point matching how the pending
/// attempt was launched.
fn feed_redirect(coordinator: &mut RedirectAuthCoordinator, redirect: &str) -> bool {
    match coordinator.awaiting_launch_mode() {
        Some(LaunchMode::Embedded) => {
            let request_code = coordinator.config().request_code;
            coordinator.on_redirect(request_code, ResultCode::Ok, Some(redirect))
        }
        _ => coordinator.on_deep_link(redirect),
    }
}

fn report(result: AuthCallbackResult) -> Result<()> {
    match result {
        AuthCallbackResult::Success(credentials) => {
            let expose = |token: &Option<common::Secret<String>>| {
                token.as_ref().map(|t| t.expose().clone())
            };
            let json = serde_json::json!({
                "outcome": "success",
                "token_type": credentials.token_type,
                "access_token": expose(&credentials.access_token),
                "id_token": expose(&credentials.id_token),
                "refresh_token": expose(&credentials.refresh_token),
            });
            println!("{json}");
            Ok(())
        }
        AuthCallbackResult::Error(failure) => {
            let cause = failure
                .cause
                .as_ref()
                .map(|c| format!(": {c}"))
                .unwrap_or_default();
            anyhow::bail!(
                "{} [{}]: {}{cause}",
                failure.title,
                failure.kind.as_str(),
                failure.description
            )
        }
        AuthCallbackResult::Cancelled => anyhow::bail!("login cancelled"),
    }
}

fn print_magic_link(uri: &str) -> Result<()> {
    let link = parse_magic_link(uri)
        .with_context(|| format!("not a passwordless magic link: {uri}"))?;
    let mode = match link.mode {
        MagicLinkMode::Email => "email",
        MagicLinkMode::Sms => "sms",
    };
    println!("{}", serde_json::json!({ "mode": mode, "code": link.code }));
    Ok(())
}
