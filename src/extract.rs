//! Readable text extraction
//!
//! External collaborator boundary: the content context asks its source for
//! the text to read when a speak command arrives without one.

/// Produces the readable text of whatever the content context is attached to
pub trait TextSource: Send {
    /// Extract readable text, `None` when there is nothing worth reading
    fn extract(&self) -> Option<String>;
}

/// Source backed by a plain text snapshot (a file or stdin in the CLI)
pub struct PlainTextSource {
    text: String,
}

impl PlainTextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextSource for PlainTextSource {
    fn extract(&self) -> Option<String> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
