//! Text Extractor (C4): two-mode PDF to text, wrapping an opaque OCR backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Fast,
    Structured,
}

#[derive(Debug, Clone)]
pub struct ExtractionStatus {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub is_oversized: bool,
    pub char_count: usize,
    pub mode: ExtractionMode,
}

#[derive(Debug, Clone)]
pub struct StructuredResult {
    pub markdown: String,
    pub images: HashMap<String, Vec<u8>>,
    pub status: ExtractionStatus,
}

/// A single extracted page, as produced by an [`OcrBackend`]. Pages that fail are
/// simply absent from the backend's returned list -- a page-level failure is not
/// fatal to the mode as a whole.
#[derive(Debug, Clone)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// A single extracted page in structured mode: markdown fragment plus any images it
/// references.
#[derive(Debug, Clone)]
pub struct PageMarkdown {
    pub page_number: usize,
    pub markdown: String,
    pub images: HashMap<String, Vec<u8>>,
}

/// Abstraction over the out-of-scope OCR engine. A real backend (Tesseract, PaddleOCR,
/// an ONNX-based engine) is an external collaborator; this crate only defines the
/// seam and a null backend for tests.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize>;
    async fn extract_fast(&self, pdf_bytes: &[u8], max_pages: usize) -> Result<Vec<PageText>>;
    async fn extract_structured(
        &self,
        pdf_bytes: &[u8],
        max_pages: usize,
    ) -> Result<Vec<PageMarkdown>>;
}

pub struct TextExtractor {
    backend: std::sync::Arc<dyn OcrBackend>,
    timeout: Duration,
}

impl TextExtractor {
    pub fn new(backend: std::sync::Arc<dyn OcrBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn extract_fast(
        &self,
        paper_id: &str,
        pdf_bytes: &[u8],
        max_pages: usize,
    ) -> Result<(String, ExtractionStatus)> {
        let total_pages = self.backend.page_count(pdf_bytes).await?;
        let pages = tokio::time::timeout(
            self.timeout,
            self.backend.extract_fast(pdf_bytes, max_pages),
        )
        .await
        .map_err(|_| Error::OcrFailed {
            paper_id: paper_id.to_string(),
            detail: "fast-mode extraction timed out".to_string(),
        })??;

        if pages.is_empty() {
            return Err(Error::OcrFailed {
                paper_id: paper_id.to_string(),
                detail: "fast-mode extraction produced zero pages".to_string(),
            });
        }

        let text = pages
            .iter()
            .map(|p| normalize_whitespace(&p.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let status = ExtractionStatus {
            total_pages,
            processed_pages: pages.len(),
            is_oversized: total_pages > max_pages,
            char_count: text.chars().count(),
            mode: ExtractionMode::Fast,
        };

        Ok((text, status))
    }

    pub async fn extract_structured(
        &self,
        paper_id: &str,
        pdf_bytes: &[u8],
        max_pages: usize,
    ) -> Result<StructuredResult> {
        let total_pages = self.backend.page_count(pdf_bytes).await?;
        let pages = tokio::time::timeout(
            self.timeout,
            self.backend.extract_structured(pdf_bytes, max_pages),
        )
        .await
        .map_err(|_| Error::OcrFailed {
            paper_id: paper_id.to_string(),
            detail: "structured-mode extraction timed out".to_string(),
        })??;

        if pages.is_empty() {
            return Err(Error::OcrFailed {
                paper_id: paper_id.to_string(),
                detail: "structured-mode extraction produced zero pages".to_string(),
            });
        }

        let mut markdown = String::new();
        let mut images = HashMap::new();
        for page in &pages {
            markdown.push_str(&page.markdown);
            markdown.push_str("\n\n");
            for (name, bytes) in &page.images {
                images.insert(format!("imgs/{name}"), bytes.clone());
            }
        }

        let status = ExtractionStatus {
            total_pages,
            processed_pages: pages.len(),
            is_oversized: total_pages > max_pages,
            char_count: markdown.chars().count(),
            mode: ExtractionMode::Structured,
        };

        Ok(StructuredResult {
            markdown,
            images,
            status,
        })
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic backend used by tests: one page of fixed text per call, no real
/// OCR engine involved.
pub struct NullOcrBackend {
    pub pages: Vec<String>,
}

#[async_trait]
impl OcrBackend for NullOcrBackend {
    async fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize> {
        Ok(self.pages.len())
    }

    async fn extract_fast(&self, _pdf_bytes: &[u8], max_pages: usize) -> Result<Vec<PageText>> {
        Ok(self
            .pages
            .iter()
            .take(max_pages)
            .enumerate()
            .map(|(i, text)| PageText {
                page_number: i + 1,
                text: text.clone(),
            })
            .collect())
    }

    async fn extract_structured(
        &self,
        _pdf_bytes: &[u8],
        max_pages: usize,
    ) -> Result<Vec<PageMarkdown>> {
        Ok(self
            .pages
            .iter()
            .take(max_pages)
            .enumerate()
            .map(|(i, text)| PageMarkdown {
                page_number: i + 1,
                markdown: format!("## Page {}\n\n{}", i + 1, text),
                images: HashMap::new(),
            })
            .collect())
    }
}
