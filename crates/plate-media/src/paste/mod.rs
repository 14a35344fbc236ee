//! Paste-time interception: plain-text payloads that look like lightweight
//! markup are converted into structured blocks before insertion.

mod classify;
mod markdown;

use std::borrow::Cow;

use plate_core::Node;

pub use classify::{MarkupSignal, classify, looks_like_markup};
pub use markdown::{TranslateError, markdown_to_fragment};

use crate::config::MediaConfig;
use crate::error::MediaError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardEntry {
    PlainText(String),
    Html(String),
    File { name: String, mime: String },
}

/// The items offered by one paste, in clipboard order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    entries: Vec<ClipboardEntry>,
}

impl ClipboardPayload {
    pub fn new(entries: Vec<ClipboardEntry>) -> Self {
        Self { entries }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![ClipboardEntry::PlainText(text.into())])
    }

    pub fn with(mut self, entry: ClipboardEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// The first plain-text item; later text items are ignored.
    pub fn first_plain_text(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            ClipboardEntry::PlainText(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasteDecision {
    pub handled: bool,
    pub fragment: Option<Vec<Node>>,
}

impl PasteDecision {
    pub fn pass_through() -> Self {
        Self {
            handled: false,
            fragment: None,
        }
    }

    pub fn converted(fragment: Vec<Node>) -> Self {
        Self {
            handled: true,
            fragment: Some(fragment),
        }
    }
}

pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Decides whether a paste is markup and converts it. Holds no document
/// state, so the same interceptor serves every paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteInterceptor {
    max_nesting: usize,
}

impl PasteInterceptor {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            max_nesting: config.max_paste_nesting,
        }
    }

    /// Translates markup text into blocks without classifying it first.
    pub fn convert(&self, text: &str) -> Result<Vec<Node>, MediaError> {
        Ok(markdown_to_fragment(text, self.max_nesting)?)
    }

    pub fn try_intercept(&self, payload: &ClipboardPayload) -> PasteDecision {
        let Some(text) = payload.first_plain_text() else {
            return PasteDecision::pass_through();
        };
        let text = normalize_line_endings(text);

        let Some(signal) = classify(&text) else {
            tracing::debug!(len = text.len(), "paste is plain text");
            return PasteDecision::pass_through();
        };
        tracing::debug!(?signal, len = text.len(), "paste looks like markup");

        match self.convert(&text) {
            Ok(fragment) => PasteDecision::converted(fragment),
            Err(err) => {
                tracing::warn!(%err, "markup translation failed, pasting as plain text");
                PasteDecision::pass_through()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_is_normalized() {
        assert_eq!(normalize_line_endings("a\r\nb\rc"), "a\nb\nc");
        assert!(matches!(normalize_line_endings("abc"), Cow::Borrowed(_)));
    }

    #[test]
    fn only_first_plain_text_item_counts() {
        let payload = ClipboardPayload::new(vec![
            ClipboardEntry::Html("<b>x</b>".into()),
            ClipboardEntry::PlainText("plain".into()),
            ClipboardEntry::PlainText("# heading".into()),
        ]);
        assert_eq!(payload.first_plain_text(), Some("plain"));
    }
}
