//! Headless Chrome backend for card captures (uses the `headless_chrome` crate).
//!
//! Every launch starts a dedicated Chrome process. Dropping the `Browser`
//! terminates that process, so closing a session is just dropping its handles.

use crate::{
    domain::{BrowserLauncher, BrowserSession},
    errors::CaptureError,
    models::Viewport,
};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing;

#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    sandbox: bool,
    idle_timeout: Duration,
}

impl ChromeLauncher {
    /// `idle_timeout` bounds how long Chrome may go without a DevTools message
    /// before it is considered dead; it must exceed every capture wait.
    pub fn new(executable: Option<PathBuf>, sandbox: bool, idle_timeout: Duration) -> Self {
        Self {
            executable,
            sandbox,
            idle_timeout,
        }
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self, viewport: &Viewport) -> Result<Box<dyn BrowserSession>, CaptureError> {
        let scale_arg = format!("--force-device-scale-factor={}", viewport.device_scale_factor);
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.sandbox)
            .path(self.executable.clone())
            .window_size(Some((viewport.width, viewport.height)))
            .args(vec![OsStr::new(&scale_arg), OsStr::new("--hide-scrollbars")])
            .ignore_certificate_errors(true)
            .idle_browser_timeout(self.idle_timeout)
            .build()
            .map_err(|e| CaptureError::Launch(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| CaptureError::Launch(format!("Failed to launch browser: {:#}", e)))?;

        // From here on the browser is owned by the session and released with it
        let tab = match browser.new_tab() {
            Ok(tab) => tab,
            Err(e) => {
                drop(browser);
                return Err(CaptureError::Launch(format!("Failed to create tab: {:#}", e)));
            }
        };

        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            scale = viewport.device_scale_factor,
            "Chrome session started"
        );

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab: Some(tab),
        }))
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeSession {
    fn tab(&self) -> Option<&Arc<Tab>> {
        self.tab.as_ref()
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), CaptureError> {
        let navigation_error = |reason: String| CaptureError::Navigation {
            url: url.to_string(),
            timeout,
            reason,
        };
        let tab = self
            .tab()
            .ok_or_else(|| navigation_error("session already closed".to_string()))?;

        tab.set_default_timeout(timeout);
        tab.navigate_to(url)
            .map_err(|e| navigation_error(format!("{:#}", e)))?
            .wait_until_navigated()
            .map_err(|e| navigation_error(format!("{:#}", e)))?;
        Ok(())
    }

    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), CaptureError> {
        let readiness_error = |reason: String| CaptureError::ReadinessTimeout {
            selector: selector.to_string(),
            timeout,
            reason,
        };
        let tab = self
            .tab()
            .ok_or_else(|| readiness_error("session already closed".to_string()))?;

        tab.wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| readiness_error(format!("{:#}", e)))?;
        Ok(())
    }

    fn screenshot_element(&mut self, selector: &str) -> Result<Option<Vec<u8>>, CaptureError> {
        let tab = self
            .tab()
            .ok_or_else(|| CaptureError::Screenshot("session already closed".to_string()))?;

        let element = match tab.find_element(selector) {
            Ok(element) => element,
            Err(e) => {
                tracing::debug!(%selector, error = %e, "Card element lookup failed");
                return Ok(None);
            }
        };

        let screenshot_error = |e: anyhow::Error| CaptureError::Screenshot(format!("{:#}", e));
        element.scroll_into_view().map_err(screenshot_error)?;
        // Border box, so the frame's padding and border are part of the image
        let clip = element.get_box_model().map_err(screenshot_error)?.border_viewport();
        let png = tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(screenshot_error)?;
        Ok(Some(png))
    }

    fn close(&mut self) {
        if let Some(tab) = self.tab.take() {
            if let Err(e) = tab.close(false) {
                tracing::debug!(error = %e, "Closing tab failed, terminating browser anyway");
            }
        }
        if let Some(browser) = self.browser.take() {
            drop(browser);
            tracing::debug!("Chrome session terminated");
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.close();
    }
}
