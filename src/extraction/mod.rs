/*!
 * Page text extraction.
 *
 * Every page goes through the same ladder: read the native text layer, test
 * it against the usability predicate, and only fall back to OCR when the
 * layer is missing or too thin to trust. Results are cached per document
 * checksum and page, and a failed page never takes the batch down with it.
 */

pub mod cache;

use futures::stream::{self, StreamExt};
use log::debug;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::app_config::ExtractionConfig;
use crate::app_controller::CancelFlag;
use crate::errors::{ExtractionError, OcrError};
use crate::ocr::OcrEngine;
use crate::pdf_document::SourceDocument;
use cache::ExtractionCache;

/// How a page's text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Decoded from the PDF text layer
    Native,
    /// Recognized from a rendered page image
    Ocr,
}

/// Extracted text for one page
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Zero-based page index
    pub page_index: usize,
    /// The extracted text
    pub text: String,
    /// Where the text came from
    pub method: ExtractionMethod,
    /// OCR confidence in 0.0..=1.0, None for native text
    pub confidence: Option<f32>,
}

/// Result of extracting one page, failures included
#[derive(Debug)]
pub struct PageOutcome {
    /// Zero-based page index
    pub page_index: usize,
    /// The extracted text or the per-page failure
    pub outcome: Result<ExtractedText, ExtractionError>,
}

/// Extracts page text with an OCR fallback
#[derive(Clone)]
pub struct PageExtractor {
    config: ExtractionConfig,
    ocr: Arc<dyn OcrEngine>,
    cache: ExtractionCache,
}

impl PageExtractor {
    /// Build an extractor over an OCR engine
    pub fn new(config: ExtractionConfig, ocr: Arc<dyn OcrEngine>) -> Self {
        let cache = ExtractionCache::with_enabled(config.cache_enabled);
        PageExtractor { config, ocr, cache }
    }

    /// Whether a native text layer is trustworthy enough to skip OCR
    // @checks: enough characters overall and enough distinct letters, so a
    // page holding only a watermark or page number still goes to OCR
    pub fn is_usable_text(text: &str, min_len: usize, min_distinct_letters: usize) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() < min_len {
            return false;
        }

        let distinct_letters: HashSet<char> = trimmed
            .chars()
            .filter(|c| c.is_alphabetic())
            .flat_map(|c| c.to_lowercase())
            .collect();
        distinct_letters.len() >= min_distinct_letters
    }

    /// Fail fast when OCR is enabled but cannot run
    // @returns: an error before any page is touched, a batch of scanned pages
    // silently falling back to "no text" would misclassify everything
    pub async fn ensure_ocr_available(&self) -> Result<(), OcrError> {
        if !self.config.ocr.enabled {
            return Ok(());
        }
        if self.ocr.is_available().await {
            Ok(())
        } else {
            Err(OcrError::Unavailable(self.ocr.name().to_string()))
        }
    }

    /// Cache hit, miss and hit-rate counters
    pub fn cache_stats(&self) -> (usize, usize, f64) {
        self.cache.stats()
    }

    /// Extract the text of a single page
    pub async fn extract_page(
        &self,
        doc: &SourceDocument,
        page_index: usize,
    ) -> Result<ExtractedText, ExtractionError> {
        if let Some(cached) = self.cache.get(doc.checksum(), page_index) {
            return Ok(cached);
        }

        let native = match doc.native_text(page_index) {
            Ok(text) => text,
            Err(e) if self.config.ocr.enabled => {
                debug!(
                    "Native text read failed on page {}, falling back to OCR: {}",
                    page_index, e
                );
                String::new()
            }
            Err(e) => return Err(e),
        };

        if Self::is_usable_text(
            &native,
            self.config.min_text_len,
            self.config.min_distinct_letters,
        ) {
            let extracted = ExtractedText {
                page_index,
                text: native,
                method: ExtractionMethod::Native,
                confidence: None,
            };
            self.cache.store(doc.checksum(), page_index, &extracted);
            return Ok(extracted);
        }

        if !self.config.ocr.enabled {
            if native.trim().is_empty() {
                return Err(ExtractionError::EmptyText { page: page_index });
            }
            // OCR is off, pass the thin text through and let matching decide
            let extracted = ExtractedText {
                page_index,
                text: native,
                method: ExtractionMethod::Native,
                confidence: None,
            };
            self.cache.store(doc.checksum(), page_index, &extracted);
            return Ok(extracted);
        }

        debug!("Page {} text layer below threshold, running OCR", page_index);
        let timeout_secs = self.config.ocr.timeout_secs;
        let recognized = tokio::select! {
            result = self.ocr.recognize_page(doc.path(), page_index) => {
                result.map_err(|source| ExtractionError::Ocr { page: page_index, source })?
            },
            _ = tokio::time::sleep(std::time::Duration::from_secs(timeout_secs)) => {
                return Err(ExtractionError::Timeout { page: page_index, timeout_secs });
            }
        };

        if recognized.text.trim().is_empty() {
            return Err(ExtractionError::EmptyText { page: page_index });
        }

        let extracted = ExtractedText {
            page_index,
            text: recognized.text,
            method: ExtractionMethod::Ocr,
            confidence: Some(recognized.confidence),
        };
        self.cache.store(doc.checksum(), page_index, &extracted);
        Ok(extracted)
    }

    /// Extract every page of a document with bounded concurrency
    // @returns: outcomes sorted by page index, plus whether cancellation cut
    // the batch short before all pages were attempted
    pub async fn extract_batch<F>(
        &self,
        doc: Arc<SourceDocument>,
        cancel: CancelFlag,
        progress_callback: F,
    ) -> (Vec<PageOutcome>, bool)
    where
        F: Fn(usize, usize) + Clone + Send + Sync + 'static,
    {
        let total = doc.page_count();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_pages));
        let processed = Arc::new(AtomicUsize::new(0));

        let results: Vec<Option<PageOutcome>> = stream::iter(0..total)
            .map(|page_index| {
                let extractor = self.clone();
                let doc = Arc::clone(&doc);
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                let processed = Arc::clone(&processed);
                let progress_callback = progress_callback.clone();

                async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let _permit = semaphore.acquire().await.unwrap();
                    if cancel.is_cancelled() {
                        return None;
                    }

                    let outcome = extractor.extract_page(&doc, page_index).await;
                    let completed = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(completed, total);
                    Some(PageOutcome {
                        page_index,
                        outcome,
                    })
                }
            })
            .buffer_unordered(self.config.max_concurrent_pages)
            .collect()
            .await;

        // restore source page order after unordered completion
        let mut outcomes: Vec<PageOutcome> = results.into_iter().flatten().collect();
        outcomes.sort_by_key(|o| o.page_index);

        let cancelled = outcomes.len() != total;
        (outcomes, cancelled)
    }
}
