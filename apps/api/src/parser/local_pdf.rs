use async_trait::async_trait;

use super::{Document, DocumentParser, ParseError, ParserSettings, UploadedFile};

/// Extracts PDF text in-process with `pdf-extract`. No network, no API key.
///
/// Produces at most one document per file; a PDF without a text layer
/// (e.g. a scanned image) yields none.
pub struct LocalPdfParser {
    settings: ParserSettings,
}

impl LocalPdfParser {
    pub fn new(settings: ParserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl DocumentParser for LocalPdfParser {
    fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    async fn load_data(&self, file: UploadedFile) -> Result<Vec<Document>, ParseError> {
        let bytes = file.bytes.clone();
        // pdf-extract is CPU-bound and may panic on malformed input
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ParseError::Worker(e.to_string()))?
            .map_err(|e| ParseError::InvalidPdf(e.to_string()))?;

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![Document {
            text,
            file_name: file.file_name,
        }])
    }
}
