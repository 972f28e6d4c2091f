use std::panic::{AssertUnwindSafe, catch_unwind};

use super::ExtractionError;

/// Decode the embedded text layer of a PDF held in memory.
///
/// `pdf-extract` panics on some malformed files; those panics are contained and reported as
/// regular extraction errors.
pub(super) fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => Err(ExtractionError::Pdf(error.to_string())),
        Err(_) => Err(ExtractionError::Pdf(
            "PDF parser aborted on malformed input".to_string(),
        )),
    }
}
