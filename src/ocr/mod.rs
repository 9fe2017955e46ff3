/*!
 * OCR engine implementations.
 *
 * The extractor talks to OCR through the [`OcrEngine`] trait so the system
 * Tesseract install can be swapped for a scripted engine in tests. Engines
 * take a source document and a page index and own the rasterization step.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

use crate::errors::OcrError;

pub mod mock;
pub mod tesseract;

pub use mock::{MockOcr, MockOcrBehavior};
pub use tesseract::TesseractOcr;

/// Recognized page text with a confidence estimate
#[derive(Debug, Clone)]
pub struct OcrText {
    /// The recognized text, line breaks preserved
    pub text: String,
    /// Mean word confidence in 0.0..=1.0
    pub confidence: f32,
}

/// Interface for OCR engines
#[async_trait]
pub trait OcrEngine: Send + Sync + Debug {
    /// Engine name used in logs and availability errors
    fn name(&self) -> &str;

    /// Recognize the text of one document page
    ///
    /// # Arguments
    /// * `source` - Path of the PDF the page belongs to
    /// * `page_index` - Zero-based page index
    ///
    /// # Returns
    /// * The recognized text with its confidence, or an error
    async fn recognize_page(&self, source: &Path, page_index: usize) -> Result<OcrText, OcrError>;

    /// Probe whether the engine can run on this system
    ///
    /// # Returns
    /// * true when every binary the engine needs is present
    async fn is_available(&self) -> bool;
}
