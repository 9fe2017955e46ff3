/*!
 * Audit trail for pages that produced no artifact.
 *
 * Every run appends one block to the unmatched log: a header line with the
 * run id, source file and period, then one line per unmatched page carrying
 * the page index, the reason code and the best attempted candidate. Page
 * content never reaches the log, payroll text stays inside the documents.
 */

use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;
use crate::matching::resolver::UnmatchedEntry;
use crate::splitter::RunPeriod;

/// Name of the rolling unmatched-page log
const UNMATCHED_LOG_FILENAME: &str = "unmatched.log";

/// Appends unmatched-page records to a per-directory audit log
#[derive(Debug, Clone)]
pub struct UnmatchedLogger {
    log_path: PathBuf,
}

impl UnmatchedLogger {
    /// Logger writing under the given logs directory
    pub fn new<P: Into<PathBuf>>(logs_dir: P) -> Self {
        UnmatchedLogger {
            log_path: logs_dir.into().join(UNMATCHED_LOG_FILENAME),
        }
    }

    /// Where entries are appended
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Append one run's unmatched entries
    // @checks: writes a run header even when the entry list is empty
    pub fn log_run(
        &self,
        run_id: &str,
        source: &Path,
        period: RunPeriod,
        entries: &[UnmatchedEntry],
    ) -> Result<()> {
        let short_id = run_id.get(..8).unwrap_or(run_id);
        let source_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.to_string_lossy().to_string());

        FileManager::append_to_log_file(
            &self.log_path,
            &format!(
                "run={} source={} period={} unmatched={}",
                short_id,
                source_name,
                period,
                entries.len()
            ),
        )?;

        for entry in entries {
            let mut line = format!(
                "run={} page={} reason={}",
                short_id,
                entry.page_index,
                entry.reason.as_str()
            );
            if let Some(detail) = &entry.detail {
                line.push_str(&format!(" detail={}", detail));
            }
            line.push_str(&format!(
                " candidate={}",
                entry.candidate.as_deref().unwrap_or("-")
            ));
            FileManager::append_to_log_file(&self.log_path, &line)?;
        }

        debug!(
            "Recorded {} unmatched entries for run {}",
            entries.len(),
            short_id
        );
        Ok(())
    }
}
