use crate::errors::{CaptureError, TemplateError};
use crate::models::Viewport;
use async_trait::async_trait;
use std::time::Duration;

/// Trait defining where the static base document comes from.
#[async_trait]
pub trait TemplateSource: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Returns the full text of the base HTML document. Never mutates it.
    async fn load(&self) -> Result<String, TemplateError>;
}

/// Trait for starting a headless browser session.
///
/// Implementations are blocking; callers run them on a blocking thread.
pub trait BrowserLauncher: Send + Sync + 'static {
    /// Starts a fresh browser with one page sized to `viewport`.
    fn launch(&self, viewport: &Viewport) -> Result<Box<dyn BrowserSession>, CaptureError>;
}

/// One live browser, owned by exactly one capture request.
pub trait BrowserSession: Send {
    /// Navigates and waits for the page to settle, failing after `timeout`.
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), CaptureError>;

    /// Waits for `selector` to match an element, failing after `timeout`.
    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), CaptureError>;

    /// Captures the bounding box of the element matching `selector` as PNG.
    /// Returns `Ok(None)` if no element matches.
    fn screenshot_element(&mut self, selector: &str) -> Result<Option<Vec<u8>>, CaptureError>;

    /// Releases the browser. Must be safe to call more than once.
    fn close(&mut self);
}
