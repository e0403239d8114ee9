//! Plain text passthrough handler.
//!
//! Handles `text/plain`, `text/markdown` and similar content types by
//! passing them through, normalizing Windows line endings so paragraph
//! splitting sees `\n\n` boundaries.

use super::ContentHandler;

/// Passes text content through without transformation.
pub struct PlainHandler;

impl ContentHandler for PlainHandler {
    fn supported_types(&self) -> &[&str] {
        &["text/plain", "text/markdown", "text/x-markdown"]
    }

    fn to_text(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).replace("\r\n", "\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(PlainHandler.to_text(b"Hello, world!"), "Hello, world!");
    }

    #[test]
    fn normalizes_crlf() {
        assert_eq!(PlainHandler.to_text(b"One\r\n\r\nTwo"), "One\n\nTwo");
    }

    #[test]
    fn handles_empty_input() {
        assert_eq!(PlainHandler.to_text(b""), "");
    }

    #[test]
    fn handles_non_utf8() {
        let bytes: &[u8] = &[0xff, 0xfe, 0x48, 0x65, 0x6c, 0x6c, 0x6f];
        assert!(PlainHandler.to_text(bytes).contains("Hello"));
    }
}
