/*!
 * Mock OCR engine for testing.
 *
 * Returns scripted text per page index without touching any external binary,
 * and counts recognition calls so tests can assert on cache behavior.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{OcrEngine, OcrText};
use crate::errors::OcrError;

/// Behavior of the mock engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOcrBehavior {
    /// Return the scripted text for the page, empty text when none is scripted
    Working,
    /// Fail every recognition with a recognition error
    Failing,
    /// Report the engine as missing
    Unavailable,
    /// Work, but only after a delay
    Slow {
        /// Delay before responding, in milliseconds
        delay_ms: u64,
    },
}

/// Scriptable OCR engine
#[derive(Debug, Clone)]
pub struct MockOcr {
    behavior: MockOcrBehavior,
    pages: HashMap<usize, OcrText>,
    call_count: Arc<AtomicUsize>,
}

impl MockOcr {
    /// Engine that answers from its scripted pages
    pub fn working() -> Self {
        Self::with_behavior(MockOcrBehavior::Working)
    }

    /// Engine that fails every recognition
    pub fn failing() -> Self {
        Self::with_behavior(MockOcrBehavior::Failing)
    }

    /// Engine that reports itself as not installed
    pub fn unavailable() -> Self {
        Self::with_behavior(MockOcrBehavior::Unavailable)
    }

    /// Engine that responds after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::with_behavior(MockOcrBehavior::Slow { delay_ms })
    }

    /// Engine with an explicit behavior
    pub fn with_behavior(behavior: MockOcrBehavior) -> Self {
        MockOcr {
            behavior,
            pages: HashMap::new(),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the text returned for one page
    pub fn with_page_text(mut self, page_index: usize, text: &str, confidence: f32) -> Self {
        self.pages.insert(
            page_index,
            OcrText {
                text: text.to_string(),
                confidence,
            },
        );
        self
    }

    /// Number of recognition calls seen so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize_page(&self, _source: &Path, page_index: usize) -> Result<OcrText, OcrError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockOcrBehavior::Working => {}
            MockOcrBehavior::Failing => {
                return Err(OcrError::Recognition("simulated OCR failure".to_string()));
            }
            MockOcrBehavior::Unavailable => {
                return Err(OcrError::Unavailable("mock".to_string()));
            }
            MockOcrBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
        }

        Ok(self.pages.get(&page_index).cloned().unwrap_or(OcrText {
            text: String::new(),
            confidence: 0.0,
        }))
    }

    async fn is_available(&self) -> bool {
        self.behavior != MockOcrBehavior::Unavailable
    }
}
