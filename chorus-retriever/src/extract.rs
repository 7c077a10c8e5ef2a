//! Plain-text extraction from uploaded file bytes.

use crate::error::IngestError;

/// Extracts plain text from `bytes` according to the file extension
/// (lowercase, without the dot). Corrupt or undecodable content fails with
/// [`IngestError::Extraction`].
pub fn extract_text(bytes: &[u8], extension: &str, filename: &str) -> Result<String, IngestError> {
    match extension {
        "txt" | "md" => String::from_utf8(bytes.to_vec()).map_err(|e| IngestError::Extraction {
            filename: filename.to_string(),
            message: format!("not valid UTF-8: {e}"),
        }),
        "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| IngestError::Extraction {
            filename: filename.to_string(),
            message: format!("PDF parsing failed: {e}"),
        }),
        other => Err(IngestError::Extraction {
            filename: filename.to_string(),
            message: format!("no extractor for extension {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = extract_text(b"hello world", "txt", "a.txt").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn invalid_utf8_is_an_extraction_error() {
        let err = extract_text(&[0xff, 0xfe, 0x00], "txt", "a.txt").unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }

    #[test]
    fn corrupt_pdf_is_an_extraction_error() {
        let err = extract_text(b"this is not a pdf", "pdf", "a.pdf").unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }
}
