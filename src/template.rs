use crate::{domain::TemplateSource, errors::TemplateError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing;

const TITLE_OPEN: &str = "<title>";
const TITLE_CLOSE: &str = "</title>";
const HEAD_CLOSE: &str = "</head>";

/// Reads the base document from disk on every request.
#[derive(Debug, Clone)]
pub struct FileTemplateSource {
    path: PathBuf,
}

impl FileTemplateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TemplateSource for FileTemplateSource {
    async fn load(&self) -> Result<String, TemplateError> {
        tracing::debug!(path = %self.path.display(), "Reading base template");
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| TemplateError::Io {
                path: self.path.display().to_string(),
                source,
            })
    }
}

/// Base document split around its three named insertion points:
/// the title content, right after `</title>`, and right before `</head>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    /// Everything up to and including `<title>`.
    head_start: String,
    /// Between `</title>` and `</head>`, exclusive.
    head_rest: String,
    /// `</head>` and everything after it.
    tail: String,
}

impl PageTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let title_open = unique_anchor(source, TITLE_OPEN)?;
        let title_close = unique_anchor(source, TITLE_CLOSE)?;
        let head_close = unique_anchor(source, HEAD_CLOSE)?;

        if title_open > title_close {
            return Err(TemplateError::AnchorOrder {
                first: TITLE_OPEN,
                second: TITLE_CLOSE,
            });
        }
        if title_close > head_close {
            return Err(TemplateError::AnchorOrder {
                first: TITLE_CLOSE,
                second: HEAD_CLOSE,
            });
        }

        let after_title = title_close + TITLE_CLOSE.len();
        Ok(Self {
            head_start: source[..title_open + TITLE_OPEN.len()].to_string(),
            head_rest: source[after_title..head_close].to_string(),
            tail: source[head_close..].to_string(),
        })
    }

    /// Assembles the document. All three arguments must already be escaped.
    pub fn render(&self, title: &str, after_title: &str, before_head_close: &str) -> String {
        let mut html = String::with_capacity(
            self.head_start.len()
                + self.head_rest.len()
                + self.tail.len()
                + title.len()
                + after_title.len()
                + before_head_close.len()
                + TITLE_CLOSE.len(),
        );
        html.push_str(&self.head_start);
        html.push_str(title);
        html.push_str(TITLE_CLOSE);
        html.push_str(after_title);
        html.push_str(&self.head_rest);
        html.push_str(before_head_close);
        html.push_str(&self.tail);
        html
    }
}

fn unique_anchor(source: &str, anchor: &'static str) -> Result<usize, TemplateError> {
    let positions: Vec<usize> = source.match_indices(anchor).map(|(i, _)| i).collect();
    match positions.as_slice() {
        [only] => Ok(*only),
        _ => Err(TemplateError::Anchor {
            anchor,
            found: positions.len(),
        }),
    }
}
