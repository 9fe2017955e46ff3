/*!
 * Source document handling.
 *
 * Wraps a loaded batch PDF together with a content checksum. The checksum is
 * the document identity used to key per-page extraction caches, so a renamed
 * copy of the same file reuses cached results while an edited file does not.
 */

use anyhow::{anyhow, Context, Result};
use log::debug;
use lopdf::Document;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::errors::{ExtractionError, SplitError};
use crate::file_utils::FileManager;

/// A loaded batch PDF with a stable content identity
pub struct SourceDocument {
    path: PathBuf,
    checksum: String,
    doc: Document,
    // 1-based page numbers in source order, indexed by 0-based page index
    page_numbers: Vec<u32>,
}

impl SourceDocument {
    /// Load a PDF from disk and compute its checksum
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(anyhow!("Source document does not exist: {:?}", path));
        }

        let checksum = FileManager::hash_file(&path).await?;

        let load_path = path.clone();
        let doc = tokio::task::spawn_blocking(move || Document::load(&load_path))
            .await
            .context("Document load task panicked")?
            .with_context(|| format!("Failed to parse PDF: {:?}", path))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(anyhow!("Document has no pages: {:?}", path));
        }

        debug!(
            "Loaded {:?}: {} pages, checksum {}",
            path.file_name().unwrap_or_default(),
            page_numbers.len(),
            &checksum[..8]
        );

        Ok(SourceDocument {
            path,
            checksum,
            doc,
            page_numbers,
        })
    }

    /// Path the document was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 checksum of the file content, hex encoded
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Number of pages in the document
    pub fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    /// Text from the page's native text layer
    // @returns: the decoded text, which may be empty for scanned pages
    pub fn native_text(&self, page_index: usize) -> Result<String, ExtractionError> {
        let number = self
            .page_number(page_index)
            .ok_or_else(|| ExtractionError::Document {
                page: page_index,
                message: format!(
                    "page index out of range, document has {} pages",
                    self.page_count()
                ),
            })?;

        self.doc
            .extract_text(&[number])
            .map_err(|e| ExtractionError::Document {
                page: page_index,
                message: e.to_string(),
            })
    }

    /// Build a new document containing exactly the given pages, in source order
    // @returns: a standalone document ready to be written out
    pub fn subset(&self, pages: &[usize]) -> Result<Document, SplitError> {
        let page_count = self.page_count();
        for &index in pages {
            if index >= page_count {
                return Err(SplitError::PageOutOfBounds { index, page_count });
            }
        }

        let keep: HashSet<usize> = pages.iter().copied().collect();
        let delete: Vec<u32> = self
            .page_numbers
            .iter()
            .enumerate()
            .filter(|(index, _)| !keep.contains(index))
            .map(|(_, number)| *number)
            .collect();

        let mut subset = self.doc.clone();
        if !delete.is_empty() {
            subset.delete_pages(&delete);
        }
        subset.prune_objects();
        subset.renumber_objects();
        subset.compress();
        Ok(subset)
    }

    fn page_number(&self, page_index: usize) -> Option<u32> {
        self.page_numbers.get(page_index).copied()
    }
}
