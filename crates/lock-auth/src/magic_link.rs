//! Passwordless magic links
//!
//! Email and SMS passwordless logins deliver a one-time code as an app link:
//! `https://<tenant>/android/<package>/email?code=123456` (or `/sms`).

use tracing::debug;
use url::Url;

use crate::callback;
use crate::constants::KEY_CODE;

const PATH_PREFIX: &str = "/android/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicLinkMode {
    Email,
    Sms,
}

/// A recognized magic link and its one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLink {
    pub mode: MagicLinkMode,
    pub code: String,
}

/// Recognize a passwordless app link.
///
/// The path must be `/android/<anything>/email` or `/android/<anything>/sms`
/// and the parameters must carry a `code`.
pub fn parse_magic_link(uri: &str) -> Option<MagicLink> {
    let url = Url::parse(uri).ok()?;
    let code = callback::parse_url(&url).get(KEY_CODE)?.to_owned();
    let rest = url.path().strip_prefix(PATH_PREFIX)?;
    let mode = if rest.ends_with("/email") {
        MagicLinkMode::Email
    } else if rest.ends_with("/sms") {
        MagicLinkMode::Sms
    } else {
        debug!(path = url.path(), "app link path is not a passwordless callback");
        return None;
    };
    Some(MagicLink { mode, code })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_email_link() {
        let link =
            parse_magic_link("https://tenant.example.com/android/com.example.app/email?code=234567")
                .unwrap();
        assert_eq!(link.mode, MagicLinkMode::Email);
        assert_eq!(link.code, "234567");
    }

    #[test]
    fn recognizes_sms_link() {
        let link =
            parse_magic_link("https://tenant.example.com/android/com.example.app/sms?code=567234")
                .unwrap();
        assert_eq!(link.mode, MagicLinkMode::Sms);
        assert_eq!(link.code, "567234");
    }

    #[test]
    fn other_paths_are_rejected() {
        assert!(
            parse_magic_link("https://tenant.example.com/android/com.example.app/other?code=1")
                .is_none()
        );
        assert!(parse_magic_link("https://tenant.example.com/ios/com.example.app/email?code=1").is_none());
        assert!(parse_magic_link("https://tenant.example.com/android/sms?code=1").is_none());
    }

    #[test]
    fn missing_code_is_rejected() {
        assert!(parse_magic_link("https://tenant.example.com/android/com.example.app/email").is_none());
        assert!(parse_magic_link("http://example.com/").is_none());
        assert!(parse_magic_link("thisshouldreturnnull").is_none());
        assert!(parse_magic_link("").is_none());
    }
}
