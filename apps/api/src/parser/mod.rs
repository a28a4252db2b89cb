//! Document parsing — turns an uploaded resume into ordered text documents.
//!
//! Default: `LlamaParseClient` (cloud parsing API, markdown output).
//! Alternative: `LocalPdfParser` (in-process, plain text, no API key).
//!
//! `AppState` holds an `Arc<dyn DocumentParser>`, chosen at startup via config.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub mod llama_parse;
pub mod local_pdf;

pub use llama_parse::LlamaParseClient;
pub use local_pdf::LocalPdfParser;

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// One segment of extracted text (typically one page).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    /// Name of the file the text came from.
    pub file_name: String,
}

/// Output format requested from the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Markdown,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Markdown => "markdown",
        }
    }
}

/// Options the parser is configured with.
#[derive(Debug, Clone)]
pub struct ParserSettings {
    pub result_type: ResultType,
    /// Upper bound on files parsed at once by `load_files`.
    pub num_workers: usize,
    /// Log job progress at `info` instead of `debug`.
    pub verbose: bool,
    pub language: String,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            result_type: ResultType::Markdown,
            num_workers: 4,
            verbose: true,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parsing job {job_id} ended with status {status}")]
    JobFailed { job_id: String, status: String },

    #[error("parsing job {job_id} did not finish within {secs}s")]
    Timeout { job_id: String, secs: u64 },

    #[error("unreadable PDF: {0}")]
    InvalidPdf(String),

    #[error("parser worker failed: {0}")]
    Worker(String),
}

/// The document parser trait. Implement this to swap extraction backends
/// without touching the handler.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    fn settings(&self) -> &ParserSettings;

    /// Parses a single file. An empty result means no text was found.
    async fn load_data(&self, file: UploadedFile) -> Result<Vec<Document>, ParseError>;
}

/// Parses `files` with at most `settings().num_workers` in flight.
/// Documents come back in file order; the first failure aborts the batch.
pub async fn load_files(
    parser: Arc<dyn DocumentParser>,
    files: Vec<UploadedFile>,
) -> Result<Vec<Document>, ParseError> {
    let permits = Arc::new(Semaphore::new(parser.settings().num_workers.max(1)));
    let mut tasks = JoinSet::new();

    for (index, file) in files.into_iter().enumerate() {
        let parser = Arc::clone(&parser);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ParseError::Worker(e.to_string()))?;
            parser.load_data(file).await.map(|docs| (index, docs))
        });
    }

    let mut batches = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let batch = joined.map_err(|e| ParseError::Worker(e.to_string()))??;
        batches.push(batch);
    }
    batches.sort_by_key(|(index, _)| *index);

    Ok(batches.into_iter().flat_map(|(_, docs)| docs).collect())
}

/// Joins document texts with a newline, in order.
pub fn join_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Echoes the file bytes back as one document, slower for earlier files.
    struct EchoParser {
        settings: ParserSettings,
    }

    #[async_trait]
    impl DocumentParser for EchoParser {
        fn settings(&self) -> &ParserSettings {
            &self.settings
        }

        async fn load_data(&self, file: UploadedFile) -> Result<Vec<Document>, ParseError> {
            if file.bytes.is_empty() {
                return Err(ParseError::InvalidPdf("empty".to_string()));
            }
            let delay = 30u64.saturating_sub(file.bytes.len() as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(vec![Document {
                text: String::from_utf8_lossy(&file.bytes).to_string(),
                file_name: file.file_name,
            }])
        }
    }

    fn file(name: &str, body: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            bytes: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = ParserSettings::default();
        assert_eq!(settings.result_type, ResultType::Markdown);
        assert_eq!(settings.num_workers, 4);
        assert!(settings.verbose);
        assert_eq!(settings.language, "en");
    }

    #[test]
    fn test_join_documents_uses_newline() {
        let docs = vec![
            Document {
                text: "# Page 1".to_string(),
                file_name: "cv.pdf".to_string(),
            },
            Document {
                text: "# Page 2".to_string(),
                file_name: "cv.pdf".to_string(),
            },
        ];
        assert_eq!(join_documents(&docs), "# Page 1\n# Page 2");
        assert_eq!(join_documents(&[]), "");
    }

    #[tokio::test]
    async fn test_load_files_preserves_file_order() {
        let parser: Arc<dyn DocumentParser> = Arc::new(EchoParser {
            settings: ParserSettings {
                num_workers: 2,
                ..ParserSettings::default()
            },
        });
        let docs = load_files(parser, vec![file("a", b"a"), file("b", b"bb"), file("c", b"ccc")])
            .await
            .unwrap();
        let texts: Vec<_> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "bb", "ccc"]);
    }

    #[tokio::test]
    async fn test_load_files_propagates_failure() {
        let parser: Arc<dyn DocumentParser> = Arc::new(EchoParser {
            settings: ParserSettings::default(),
        });
        let err = load_files(parser, vec![file("a", b"a"), file("empty", b"")])
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidPdf(_)));
    }
}
