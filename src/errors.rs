/*!
 * Error types for the paysplit application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the OCR engine
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine or page renderer is not installed on this system
    #[error("OCR engine '{0}' is not available on this system")]
    Unavailable(String),

    /// Rasterizing a page into an image failed
    #[error("Page rendering failed: {0}")]
    Render(String),

    /// The OCR process could not be started
    #[error("Failed to launch OCR process: {0}")]
    Launch(String),

    /// The OCR process ran but reported a failure
    #[error("OCR recognition failed: {0}")]
    Recognition(String),

    /// The OCR process exceeded its time budget
    #[error("OCR timed out after {0}s")]
    Timeout(u64),
}

impl OcrError {
    /// Whether this error should abort the whole run rather than a single page
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors that can occur when extracting text from a single page
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Neither the native text layer nor OCR produced any text
    #[error("Page {page} produced no extractable text")]
    EmptyText {
        /// Zero-based page index
        page: usize,
    },

    /// The page could not be read from the document structure
    #[error("Failed to read page {page}: {message}")]
    Document {
        /// Zero-based page index
        page: usize,
        /// Parser-level failure description
        message: String,
    },

    /// The OCR fallback failed for this page
    #[error("OCR failed on page {page}: {source}")]
    Ocr {
        /// Zero-based page index
        page: usize,
        /// Underlying OCR failure
        #[source]
        source: OcrError,
    },

    /// The OCR fallback exceeded the per-page time budget
    #[error("Extraction timed out on page {page} after {timeout_secs}s")]
    Timeout {
        /// Zero-based page index
        page: usize,
        /// Configured per-page budget
        timeout_secs: u64,
    },
}

impl ExtractionError {
    /// The page this error belongs to
    pub fn page(&self) -> usize {
        match self {
            Self::EmptyText { page }
            | Self::Document { page, .. }
            | Self::Ocr { page, .. }
            | Self::Timeout { page, .. } => *page,
        }
    }

    /// Short machine-readable reason for audit lines
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::EmptyText { .. } => "empty_text",
            Self::Document { .. } => "document",
            Self::Ocr { .. } => "ocr",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Errors that can occur while writing per-recipient output documents
#[derive(Error, Debug)]
pub enum SplitError {
    /// A resolved page index does not exist in the source document
    #[error("Page index {index} is out of bounds, document has {page_count} pages")]
    PageOutOfBounds {
        /// Offending zero-based page index
        index: usize,
        /// Number of pages in the source document
        page_count: usize,
    },

    /// A recipient ended up with an empty page set
    #[error("Empty page set for recipient '{0}'")]
    EmptyRange(String),

    /// Assembling the output document failed at the PDF level
    #[error("Failed to assemble output document: {0}")]
    Document(String),

    /// Writing or publishing the output file failed
    #[error("Failed to write output file: {0}")]
    Write(#[from] std::io::Error),
}

/// Errors that can occur when managing the recipient registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Lookup by name found no recipient
    #[error("Recipient '{0}' not found in the registry")]
    NotFound(String),

    /// A recipient with the same name already exists
    #[error("Recipient '{0}' already exists in the registry")]
    Duplicate(String),

    /// An email address failed validation
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

/// Errors that can occur when pairing attachments with recipients
#[derive(Error, Debug)]
pub enum AttachmentError {
    /// The file extension is not on the allowed list
    #[error("Unsupported attachment extension '{extension}' for file {path:?}")]
    UnsupportedExtension {
        /// The rejected file
        path: PathBuf,
        /// Lowercased extension, empty when the file has none
        extension: String,
    },

    /// The selected file does not exist on disk
    #[error("Attachment file does not exist: {0:?}")]
    Missing(PathBuf),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from page text extraction
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Error from the OCR engine
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Error from document splitting
    #[error("Split error: {0}")]
    Split(#[from] SplitError),

    /// Error from the recipient registry
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Error from attachment pairing
    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
