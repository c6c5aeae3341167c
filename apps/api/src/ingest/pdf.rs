//! PDF resume adapter.
//!
//! Extraction is CPU-bound and `pdf-extract` may panic on malformed input,
//! so it runs inside `tokio::task::spawn_blocking`; a panic surfaces as a
//! `JoinError` and is reported as `ExtractionFailure`.

use bytes::Bytes;
use tracing::{info, warn};

use crate::ingest::{collapse_whitespace, truncate_chars, DocumentContext, IngestError};
use crate::record::merge::UpdatePayload;
use crate::record::Field;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Extracts plain text from PDF bytes.
pub async fn extract_pdf_text(bytes: Bytes) -> Result<String, IngestError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(IngestError::ExtractionFailure(
            "file is not a PDF document".to_string(),
        ));
    }

    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await;

    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Err(IngestError::ExtractionFailure(e.to_string())),
        Err(join_err) => {
            warn!("PDF extractor aborted: {join_err}");
            return Err(IngestError::ExtractionFailure(
                "the document could not be read".to_string(),
            ));
        }
    };

    let text = collapse_whitespace(&text);
    if text.is_empty() {
        return Err(IngestError::NoExtractableText);
    }
    Ok(text)
}

/// Full adapter: extract, truncate, and describe the resume for the agent.
pub async fn ingest_resume(
    file_name: &str,
    bytes: Bytes,
    max_chars: usize,
) -> Result<DocumentContext, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyInput);
    }
    let size = bytes.len();
    let text = extract_pdf_text(bytes).await?;
    info!(
        "Extracted {} chars from resume '{}' ({} bytes)",
        text.chars().count(),
        file_name,
        size
    );

    Ok(DocumentContext {
        notice: format!("Resume '{file_name}' processed. The assistant will consider its content."),
        context: format!(
            "(System note: the user uploaded a resume named '{}'. Extracted text:\n\n{})",
            file_name,
            truncate_chars(&text, max_chars)
        ),
        payload: UpdatePayload::new().with(Field::ResumeFile, file_name),
    })
}
