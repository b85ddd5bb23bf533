//! Plain-text extraction from binary documents.

use crate::error::{RelayError, Result};

/// Turns a binary document into plain text.
pub trait TextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// PDF text extraction backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        // pdf-extract can panic on malformed PDFs
        let owned = bytes.to_vec();
        let result = std::panic::catch_unwind(move || pdf_extract::extract_text_from_mem(&owned));

        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(RelayError::Extraction(format!("PDF: {e}"))),
            Err(_) => Err(RelayError::Extraction(
                "PDF extraction panicked (malformed file)".to_string(),
            )),
        }
    }
}
