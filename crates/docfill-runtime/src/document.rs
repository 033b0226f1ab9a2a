//! Document text extraction.
//!
//! The core treats document text as opaque; this module produces it. PDF
//! parsing itself is delegated to `pdf-extract`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Unreadable(String),

    #[error("PDF file is empty")]
    Empty,
}

/// Extraction settings, fixed when the extractor is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Inserted between the text of consecutive pages
    pub page_separator: String,

    /// Truncate the extracted text to this many characters
    pub max_chars: Option<usize>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            page_separator: "\n".to_string(),
            max_chars: None,
        }
    }
}

/// Turns document bytes into plain text.
///
/// Extraction is CPU-bound and synchronous; async callers run it on a
/// blocking thread.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DocumentError>;

    fn extract_file(&self, path: &Path) -> Result<String, DocumentError> {
        let bytes = std::fs::read(path)?;
        self.extract_text(&bytes)
    }
}

/// PDF text extractor backed by `pdf-extract`.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor {
    config: ExtractorConfig,
}

impl PdfTextExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }

        // pdf-extract panics on some malformed inputs
        let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| DocumentError::Unreadable("PDF parser aborted on malformed input".to_string()))?
            .map_err(|e| DocumentError::Unreadable(format!("PDF extraction failed: {}", e)))?;

        let text = join_pages(&pages, &self.config)?;
        tracing::debug!(pages = pages.len(), chars = text.chars().count(), "extracted document text");
        Ok(text)
    }
}

/// Join page texts and apply the length cap. A document whose pages hold no
/// text at all is reported as empty.
fn join_pages(pages: &[String], config: &ExtractorConfig) -> Result<String, DocumentError> {
    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(DocumentError::Empty);
    }

    let text = pages
        .iter()
        .map(|p| p.trim())
        .collect::<Vec<_>>()
        .join(&config.page_separator);

    Ok(match config.max_chars {
        Some(max) => text.chars().take(max).collect(),
        None => text,
    })
}
