// Document Ingestion Adapters: turn an uploaded resume or a profile link
// into plain-text context for the next user turn.

pub mod pdf;
pub mod profile;

use thiserror::Error;

use crate::record::merge::UpdatePayload;

/// Largest accepted resume upload, matching a typical browser uploader cap.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 1500;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No extractable text found in document")]
    NoExtractableText,

    #[error("Text extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Invalid profile URL: {0}")]
    InvalidUrl(String),

    #[error("Nothing to ingest")]
    EmptyInput,
}

/// What an adapter hands to the session.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    /// Short inline notice for the display layer.
    pub notice: String,
    /// System note prefixed to the next user turn.
    pub context: String,
    /// Provenance fields, applied through the merge engine.
    pub payload: UpdatePayload,
}

/// Truncates to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{} ... [truncated]", text[..byte_idx].trim_end()),
        None => text.to_string(),
    }
}

/// Collapses runs of whitespace so extracted text stays compact.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo ... [truncated]");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n b\t c "), "a b c");
    }
}
