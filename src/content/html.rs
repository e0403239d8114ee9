//! HTML to plain text extraction.
//!
//! Walks the parsed DOM and concatenates every text node that is not inside
//! a `<script>` or `<style>` element. Whitespace inside text nodes is kept as
//! written, so blank lines in the source still mark paragraph boundaries.

use scraper::{Html, Node};

use super::{collapse_blank_lines, ContentHandler};

/// Elements whose text content is never visible.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style"];

/// Extracts visible text from HTML documents.
pub struct HtmlHandler;

impl ContentHandler for HtmlHandler {
    fn supported_types(&self) -> &[&str] {
        &["text/html", "application/xhtml+xml"]
    }

    fn to_text(&self, bytes: &[u8]) -> String {
        let html = String::from_utf8_lossy(bytes);
        visible_text(&html)
    }
}

/// Extract the visible text of an HTML document.
///
/// Script and style content is dropped; everything else is concatenated in
/// document order, then runs of blank lines are collapsed to one.
pub fn extract_text(html: &str) -> String {
    collapse_blank_lines(&visible_text(html))
}

fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);

    for node in document.tree.root().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });

        if !hidden {
            text.push_str(fragment);
        }
    }

    text
}
