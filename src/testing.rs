//! In-memory stand-ins for the template file and the browser, shared by unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{BrowserLauncher, BrowserSession, TemplateSource};
use crate::errors::{CaptureError, TemplateError};
use crate::models::Viewport;

pub const SKELETON: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Virtual Holiday Greeting Card</title>
    <link rel="stylesheet" href="styles.css">
</head>
<body>
    <div class="tab-frame"><div class="candy-cane-border-fixed"></div></div>
</body>
</html>
"#;

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-card";

pub struct StaticTemplate {
    html: Option<&'static str>,
}

impl StaticTemplate {
    pub fn new(html: &'static str) -> Self {
        Self { html: Some(html) }
    }

    pub fn failing() -> Self {
        Self { html: None }
    }
}

#[async_trait]
impl TemplateSource for StaticTemplate {
    async fn load(&self) -> Result<String, TemplateError> {
        self.html.map(str::to_string).ok_or_else(|| TemplateError::Io {
            path: "static".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "template removed"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    Succeed,
    LaunchFails,
    NavigationStalls,
    NeverReady,
    ElementVanishes,
    ScreenshotFails,
}

#[derive(Debug, Clone, Default)]
pub struct RecordedWaits {
    pub navigation: Option<Duration>,
    pub readiness: Option<Duration>,
    pub selector: Option<String>,
}

#[derive(Default)]
struct Record {
    launches: usize,
    releases: usize,
    visited: Vec<String>,
    viewport: Option<Viewport>,
    waits: RecordedWaits,
}

/// Launcher whose sessions follow a scripted `FakeBehavior` and report
/// every launch and release.
#[derive(Clone)]
pub struct FakeLauncher {
    behavior: FakeBehavior,
    record: Arc<Mutex<Record>>,
}

impl FakeLauncher {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            record: Arc::default(),
        }
    }

    pub fn launches(&self) -> usize {
        self.record.lock().unwrap().launches
    }

    pub fn releases(&self) -> usize {
        self.record.lock().unwrap().releases
    }

    pub fn visited(&self) -> Vec<String> {
        self.record.lock().unwrap().visited.clone()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.record.lock().unwrap().viewport
    }

    pub fn waits(&self) -> RecordedWaits {
        self.record.lock().unwrap().waits.clone()
    }
}

impl BrowserLauncher for FakeLauncher {
    fn launch(&self, viewport: &Viewport) -> Result<Box<dyn BrowserSession>, CaptureError> {
        if self.behavior == FakeBehavior::LaunchFails {
            return Err(CaptureError::Launch("no chrome binary".to_string()));
        }
        let mut record = self.record.lock().unwrap();
        record.launches += 1;
        record.viewport = Some(*viewport);
        Ok(Box::new(FakeSession {
            behavior: self.behavior,
            record: Arc::clone(&self.record),
            closed: false,
        }))
    }
}

struct FakeSession {
    behavior: FakeBehavior,
    record: Arc<Mutex<Record>>,
    closed: bool,
}

impl BrowserSession for FakeSession {
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), CaptureError> {
        let mut record = self.record.lock().unwrap();
        record.visited.push(url.to_string());
        record.waits.navigation = Some(timeout);
        if self.behavior == FakeBehavior::NavigationStalls {
            return Err(CaptureError::Navigation {
                url: url.to_string(),
                timeout,
                reason: "network never went idle".to_string(),
            });
        }
        Ok(())
    }

    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), CaptureError> {
        let mut record = self.record.lock().unwrap();
        record.waits.readiness = Some(timeout);
        record.waits.selector = Some(selector.to_string());
        if self.behavior == FakeBehavior::NeverReady {
            return Err(CaptureError::ReadinessTimeout {
                selector: selector.to_string(),
                timeout,
                reason: "The event waited for never came".to_string(),
            });
        }
        Ok(())
    }

    fn screenshot_element(&mut self, _selector: &str) -> Result<Option<Vec<u8>>, CaptureError> {
        match self.behavior {
            FakeBehavior::ElementVanishes => Ok(None),
            FakeBehavior::ScreenshotFails => {
                Err(CaptureError::Screenshot("box model unavailable".to_string()))
            }
            _ => Ok(Some(FAKE_PNG.to_vec())),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.record.lock().unwrap().releases += 1;
        }
    }
}
