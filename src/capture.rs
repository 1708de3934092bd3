//! Capture Orchestrator: renders `/card` in a headless browser and returns a
//! PNG of the visible card element.
//!
//! Each call owns one browser session from launch to release. Nothing is
//! pooled or retried; the two waits are bounded by the configured timeouts.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::domain::{BrowserLauncher, BrowserSession};
use crate::errors::CaptureError;
use crate::models::{CaptureResult, CaptureSettings, RequestOrigin, ShareRequest};

pub struct CaptureOrchestrator {
    launcher: Arc<dyn BrowserLauncher>,
    settings: CaptureSettings,
}

impl CaptureOrchestrator {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: CaptureSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// `/card` URL on the same origin, carrying the original parameters verbatim.
    pub fn card_url(request: &ShareRequest, origin: &RequestOrigin) -> String {
        let query = request.to_query();
        if query.is_empty() {
            format!("{}/card", origin.base_url())
        } else {
            format!("{}/card?{}", origin.base_url(), query)
        }
    }

    /// Blocking. Run on a blocking thread.
    pub fn capture(
        &self,
        request: &ShareRequest,
        origin: &RequestOrigin,
    ) -> Result<CaptureResult, CaptureError> {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("capture", %session_id);
        let _entered = span.enter();

        let url = Self::card_url(request, origin);
        let started = Instant::now();
        tracing::info!(%url, "Starting card capture");

        let mut session = SessionGuard::new(self.launcher.launch(&self.settings.viewport)?);

        session.navigate(&url, self.settings.navigation_timeout)?;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Card page settled");

        session.wait_for_element(&self.settings.selector, self.settings.readiness_timeout)?;

        // Let in-page transitions finish before sampling pixels
        std::thread::sleep(self.settings.settle_delay);

        let png = session
            .screenshot_element(&self.settings.selector)?
            .ok_or_else(|| CaptureError::ElementNotFound(self.settings.selector.clone()))?;

        tracing::info!(
            bytes = png.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Card capture complete"
        );
        Ok(CaptureResult { png })
    }
}

/// Closes the wrapped session when dropped, on success, error or unwind alike.
struct SessionGuard {
    session: Box<dyn BrowserSession>,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self { session }
    }
}

impl Deref for SessionGuard {
    type Target = dyn BrowserSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
        tracing::debug!("Browser session released");
    }
}
