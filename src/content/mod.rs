//! Prompt extraction from remote documents.
//!
//! Routes fetched bytes to a [`ContentHandler`] based on the
//! `Content-Type` header. Every handler yields plain text whose paragraphs
//! are separated by exactly one blank line, ready to be split into segments.
//!
//! # Supported Content Types
//!
//! | Type | Handler |
//! |------|---------|
//! | `text/html`, `application/xhtml+xml` | [`HtmlHandler`] |
//! | `text/plain`, `text/markdown`, etc. | [`PlainHandler`] |
//!
//! # Example
//!
//! ```rust
//! use vidmaker::content::ContentRouter;
//!
//! let router = ContentRouter::new();
//! let html = b"<html><body><script>x()</script><p>Hello</p></body></html>";
//! let text = router.convert(html, "text/html");
//! assert!(text.contains("Hello"));
//! assert!(!text.contains("x()"));
//! ```

pub mod html;
pub mod plain;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::provider::Fetcher;

pub use html::{extract_text, HtmlHandler};
pub use plain::PlainHandler;

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

/// Converts document bytes into prompt text.
///
/// Implementations are stateless and synchronous.
pub trait ContentHandler: Send + Sync {
    /// MIME types this handler supports (e.g., `["text/html"]`).
    fn supported_types(&self) -> &[&str];

    /// Convert raw document bytes to text. Blank-line collapsing is applied
    /// by the router afterwards.
    fn to_text(&self, bytes: &[u8]) -> String;
}

/// Routes document bytes to the appropriate [`ContentHandler`] based on
/// the `Content-Type` header.
pub struct ContentRouter {
    handlers: Vec<Box<dyn ContentHandler>>,
}

impl ContentRouter {
    /// Create a router with all available handlers.
    #[must_use]
    pub fn new() -> Self {
        let handlers: Vec<Box<dyn ContentHandler>> =
            vec![Box::new(html::HtmlHandler), Box::new(plain::PlainHandler)];

        Self { handlers }
    }

    /// Find a handler for the given content type and convert the bytes.
    ///
    /// Falls back to HTML if the bytes look like HTML (common for responses
    /// with missing or generic `Content-Type`), then to plain text.
    pub fn convert(&self, bytes: &[u8], content_type: &str) -> String {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_lowercase();

        let handler = self
            .handlers
            .iter()
            .find(|h| h.supported_types().iter().any(|t| *t == mime));

        let text = match handler {
            Some(handler) => handler.to_text(bytes),
            None if looks_like_html(bytes) => html::HtmlHandler.to_text(bytes),
            None => plain::PlainHandler.to_text(bytes),
        };

        collapse_blank_lines(&text)
    }
}

impl Default for ContentRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse every run of three or more newlines into exactly two, so that
/// paragraph boundaries survive while empty paragraphs disappear.
#[must_use]
pub fn collapse_blank_lines(text: &str) -> String {
    EXCESS_NEWLINES.replace_all(text, "\n\n").into_owned()
}

/// Fetch `url` and extract its prompt text.
#[instrument(skip(fetcher))]
pub async fn fetch_prompt(fetcher: &dyn Fetcher, url: &str) -> Result<String> {
    let document = fetcher.fetch(url).await?;
    debug!(
        bytes = document.bytes.len(),
        content_type = %document.content_type,
        "Document fetched"
    );

    Ok(ContentRouter::new().convert(&document.bytes, &document.content_type))
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(64)];
    let head = String::from_utf8_lossy(head);
    let head = head
        .trim_start_matches('\u{feff}')
        .trim_start()
        .to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}
