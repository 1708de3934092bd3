use axum::http::{HeaderMap, Uri};
use std::time::Duration;

use crate::errors::DecodeError;
use crate::escape::decode_component;

/// Theme id used when a request names no theme or an unknown one.
pub const DEFAULT_THEME_ID: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub id: String,
    pub name: String,
}

/// Immutable id → display name table, handed to the synthesizer at construction.
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    themes: Vec<Theme>,
    default_index: usize,
}

impl ThemeCatalog {
    pub fn default_theme(&self) -> &Theme {
        &self.themes[self.default_index]
    }

    /// Looks up a theme, silently falling back to the default entry.
    pub fn resolve(&self, id: Option<&str>) -> &Theme {
        id.filter(|id| !id.is_empty())
            .and_then(|id| self.themes.iter().find(|t| t.id == id))
            .unwrap_or_else(|| self.default_theme())
    }
}

impl Default for ThemeCatalog {
    fn default() -> Self {
        let themes: Vec<Theme> = [
            ("1", "Snowy Cabin"),
            ("2", "Santa's Workshop"),
            ("3", "Winter Wonderland"),
        ]
        .into_iter()
        .map(|(id, name)| Theme {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();

        let default_index = themes
            .iter()
            .position(|t| t.id == DEFAULT_THEME_ID)
            .unwrap_or(0);
        Self {
            themes,
            default_index,
        }
    }
}

/// Share parameters exactly as they arrived in the query string.
///
/// `raw_message` is still percent-encoded; it is decoded by the synthesizer
/// and forwarded untouched by the capture path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareRequest {
    pub theme_id: Option<String>,
    pub raw_message: Option<String>,
}

impl ShareRequest {
    /// Parses `t` and `m` from a raw query string. Empty values count as absent
    /// and the first occurrence of a key wins.
    pub fn from_raw_query(query: Option<&str>) -> Self {
        let mut request = ShareRequest::default();
        for pair in query.unwrap_or_default().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if value.is_empty() {
                continue;
            }
            let slot = match key {
                "t" => &mut request.theme_id,
                "m" => &mut request.raw_message,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }
        request
    }

    /// Decodes the user message; a missing message decodes to an empty string.
    pub fn decode_message(&self) -> Result<String, DecodeError> {
        match &self.raw_message {
            Some(raw) => decode_component(raw),
            None => Ok(String::new()),
        }
    }

    /// Re-encodes the parameters for a `/card` URL, values forwarded verbatim.
    pub fn to_query(&self) -> String {
        let mut params = Vec::new();
        if let Some(t) = &self.theme_id {
            params.push(format!("t={}", t));
        }
        if let Some(m) = &self.raw_message {
            params.push(format!("m={}", m));
        }
        params.join("&")
    }
}

/// Where the current request was addressed, as seen by the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
    pub path_and_query: String,
}

impl RequestOrigin {
    /// Resolves scheme and host from `X-Forwarded-Proto`, `X-Forwarded-Host`
    /// and `Host`, in that order of preference.
    pub fn from_parts(headers: &HeaderMap, uri: &Uri, default_scheme: &str) -> Self {
        let scheme = first_header_value(headers, "x-forwarded-proto")
            .unwrap_or(default_scheme)
            .to_string();
        let host = first_header_value(headers, "x-forwarded-host")
            .or_else(|| first_header_value(headers, "host"))
            .unwrap_or("localhost")
            .to_string();
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Self {
            scheme,
            host,
            path_and_query,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Full URL of the request, used as the canonical document URL.
    pub fn canonical_url(&self) -> String {
        format!("{}{}", self.base_url(), self.path_and_query)
    }
}

// Proxies may append to forwarded headers; the client-facing value comes first.
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewMetadata {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub image_url: String,
}

/// A synthesized card page plus the unescaped values embedded in it.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub html: String,
    pub metadata: PreviewMetadata,
    pub share_message: String,
}

/// PNG bytes covering exactly the card element's bounding box.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub png: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1200,
            device_scale_factor: 2.0,
        }
    }
}

/// Selector of the visible card face captured by `/screenshot`.
pub const CARD_SELECTOR: &str = ".tab-frame:not(.hidden) .candy-cane-border-fixed";

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub viewport: Viewport,
    pub navigation_timeout: Duration,
    pub readiness_timeout: Duration,
    pub settle_delay: Duration,
    pub selector: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            navigation_timeout: Duration::from_secs(30),
            readiness_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(500),
            selector: CARD_SELECTOR.to_string(),
        }
    }
}
