//! Seam to the platform surface that shows the authorize page

use url::Url;

use crate::error::Result;

/// Opens an authorize URI on behalf of the coordinator.
///
/// Called on the coordinator's owning task. Implementations only start
/// the navigation; the outcome comes back through the coordinator's
/// redirect entry points.
pub trait Launcher {
    /// Hand the URI to an external browser. The redirect arrives later as a
    /// deep link.
    fn open_browser(&mut self, uri: &Url) -> Result<()>;

    /// Show the URI in an embedded web surface. The redirect arrives as an
    /// activity result tagged with `request_code`.
    fn open_embedded(&mut self, uri: &Url, request_code: i32, connection: Option<&str>)
    -> Result<()>;
}
