//! PDF document parser using pdf-extract
//!
//! Extracts text content from PDF files, handling multi-page documents.

use std::path::Path;

use crate::{DocumentParser, FileType, ParsedDocument, ParserError, Result};

/// PDF document parser
pub struct PdfParser;

impl PdfParser {
    /// Create a new PDF parser
    pub fn new() -> Self {
        Self
    }

    /// Extract text from PDF bytes
    fn extract_text(&self, bytes: &[u8]) -> Result<(String, Option<u32>)> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParserError::PdfError(e.to_string()))?;

        // Rough page estimate from form feed characters
        let breaks = text.matches('\x0C').count() as u32;
        let page_count = if breaks > 0 { Some(breaks + 1) } else { None };

        Ok((text, page_count))
    }

    fn build(&self, source: String, bytes: &[u8]) -> Result<ParsedDocument> {
        let (text, page_count) = self.extract_text(bytes)?;

        let mut doc = ParsedDocument::new(source, FileType::Pdf).with_content(text);
        doc.page_count = page_count;
        Ok(doc)
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        self.build(path.display().to_string(), &bytes)
    }

    fn parse_bytes(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument> {
        self.build(filename.to_string(), bytes)
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Pdf]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_types() {
        let parser = PdfParser::new();
        assert!(parser.can_parse(FileType::Pdf));
        assert!(!parser.can_parse(FileType::PlainText));
    }

    #[test]
    fn test_invalid_pdf_bytes_fail() {
        let parser = PdfParser::new();
        let err = parser.parse_bytes(b"not a pdf", "bad.pdf").unwrap_err();
        assert!(matches!(err, ParserError::PdfError(_)));
    }
}
