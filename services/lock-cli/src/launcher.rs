//! Terminal stand-in for the platform launcher
//!
//! Prints the authorize URI for the user to open. The redirect is pasted
//! back on stdin and fed to the coordinator by `main`.

use std::io::Write;

use tracing::info;
use url::Url;
use web_auth::{Error, Launcher, Result};

pub struct TerminalLauncher<W: Write> {
    out: W,
}

impl<W: Write> TerminalLauncher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn print(&mut self, prompt: &str, uri: &Url) -> Result<()> {
        writeln!(self.out, "{prompt}\n\n  {uri}\n")
            .and_then(|()| {
                writeln!(
                    self.out,
                    "Paste the URL you were redirected to (empty line to cancel):"
                )
            })
            .and_then(|()| self.out.flush())
            .map_err(|e| Error::Launch(e.to_string()))
    }
}

impl<W: Write> Launcher for TerminalLauncher<W> {
    fn open_browser(&mut self, uri: &Url) -> Result<()> {
        info!(host = uri.host_str(), "opening authorize URI in browser");
        self.print("Open this URL in your browser:", uri)
    }

    fn open_embedded(
        &mut self,
        uri: &Url,
        request_code: i32,
        connection: Option<&str>,
    ) -> Result<()> {
        info!(
            host = uri.host_str(),
            request_code,
            connection = connection.unwrap_or("<hosted>"),
            "opening authorize URI in embedded surface"
        );
        let prompt = match connection {
            Some(connection) => format!("Log in with {connection}:"),
            None => "Log in:".to_owned(),
        };
        self.print(&prompt, uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_uri_and_prompt() {
        let mut out = Vec::new();
        let uri = Url::parse("https://tenant.example.com/authorize?client_id=abc").unwrap();
        TerminalLauncher::new(&mut out).open_browser(&uri).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("https://tenant.example.com/authorize?client_id=abc"));
        assert!(text.contains("Paste the URL"));
    }

    #[test]
    fn embedded_prompt_names_connection() {
        let mut out = Vec::new();
        let uri = Url::parse("https://tenant.example.com/authorize").unwrap();
        TerminalLauncher::new(&mut out)
            .open_embedded(&uri, 110, Some("corp-adfs"))
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Log in with corp-adfs:"));
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_launch_error() {
        let uri = Url::parse("https://tenant.example.com/authorize").unwrap();
        let err = TerminalLauncher::new(Broken).open_browser(&uri).unwrap_err();
        assert!(matches!(err, Error::Launch(_)));
    }
}
