/*!
 * Per-recipient document splitting.
 *
 * Each resolved page range becomes one standalone PDF named after the
 * recipient and the accounting period. Output is deterministic: the same
 * source, registry and period produce byte-identical artifacts, so no
 * generation timestamp ever enters the document. Files are written to a
 * temporary name and published atomically, a crash mid-write leaves no
 * half-written artifact behind.
 */

use anyhow::{anyhow, Result};
use log::debug;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

use crate::errors::SplitError;
use crate::file_utils::FileManager;
use crate::matching::resolver::PageRange;
use crate::pdf_document::SourceDocument;

/// Accounting period a batch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPeriod {
    year: u16,
    month: u8,
}

impl RunPeriod {
    /// Build a period, validating the year and month ranges
    pub fn new(year: u16, month: u8) -> Result<Self> {
        if !(1900..=2100).contains(&year) {
            return Err(anyhow!("Year must be between 1900 and 2100, got {}", year));
        }
        if !(1..=12).contains(&month) {
            return Err(anyhow!("Month must be between 1 and 12, got {}", month));
        }
        Ok(RunPeriod { year, month })
    }

    /// The period's year
    pub fn year(&self) -> u16 {
        self.year
    }

    /// The period's month, 1-based
    pub fn month(&self) -> u8 {
        self.month
    }
}

impl fmt::Display for RunPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for RunPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| anyhow!("Period must be YYYY-MM, got '{}'", s))?;
        let year: u16 = year
            .parse()
            .map_err(|_| anyhow!("Invalid year in period '{}'", s))?;
        let month: u8 = month
            .parse()
            .map_err(|_| anyhow!("Invalid month in period '{}'", s))?;
        RunPeriod::new(year, month)
    }
}

/// One written per-recipient document
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    /// Registry id of the recipient
    pub recipient_id: i64,
    /// Display name of the recipient
    pub recipient_name: String,
    /// Where the artifact was published
    pub path: PathBuf,
    /// Source page indexes the artifact contains, ascending
    pub pages: Vec<usize>,
    /// Size of the published file in bytes
    pub bytes_written: u64,
}

/// Writes per-recipient documents for resolved page ranges
#[derive(Debug, Clone)]
pub struct DocumentSplitter {
    output_dir: PathBuf,
    period: RunPeriod,
}

impl DocumentSplitter {
    /// Splitter writing under an output directory for one period
    pub fn new<P: Into<PathBuf>>(output_dir: P, period: RunPeriod) -> Self {
        DocumentSplitter {
            output_dir: output_dir.into(),
            period,
        }
    }

    /// The period artifacts are named for
    pub fn period(&self) -> RunPeriod {
        self.period
    }

    /// Deterministic artifact path for a recipient
    // @returns: <output_dir>/<recipient>/<recipient> - <YYYY-MM>.pdf
    pub fn artifact_path(&self, recipient_name: &str) -> PathBuf {
        let stem = FileManager::sanitize_file_stem(recipient_name);
        self.output_dir
            .join(&stem)
            .join(format!("{} - {}.pdf", stem, self.period))
    }

    /// Write one recipient's pages as a standalone document
    // @returns: the published artifact, or an error confined to this recipient
    pub fn split(
        &self,
        source: &SourceDocument,
        range: &PageRange,
    ) -> Result<OutputArtifact, SplitError> {
        if range.pages.is_empty() {
            return Err(SplitError::EmptyRange(range.recipient_name.clone()));
        }

        let mut subset = source.subset(&range.pages)?;

        let path = self.artifact_path(&range.recipient_name);
        let parent = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;

        // write to a sibling temp file, publish with an atomic rename
        let mut temp = NamedTempFile::new_in(parent)?;
        subset
            .save_to(&mut temp)
            .map_err(|e| SplitError::Document(e.to_string()))?;
        temp.flush()?;
        let bytes_written = temp.as_file().metadata()?.len();
        temp.persist(&path).map_err(|e| SplitError::Write(e.error))?;

        debug!(
            "Wrote {} pages for '{}' to {:?} ({} bytes)",
            range.pages.len(),
            range.recipient_name,
            path,
            bytes_written
        );

        Ok(OutputArtifact {
            recipient_id: range.recipient_id,
            recipient_name: range.recipient_name.clone(),
            path,
            pages: range.pages.clone(),
            bytes_written,
        })
    }
}
