/*!
 * Pairing of supplementary files with split artifacts.
 *
 * Recipients may receive extra documents alongside their payroll pages,
 * holiday notices, expense forms and similar. Only a whitelisted set of
 * extensions is ever attached; a recipient record can override the global
 * whitelist. Unsupported files are surfaced as errors instead of being
 * silently dropped.
 */

use anyhow::Result;
use log::debug;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::app_config::AttachmentConfig;
use crate::errors::AttachmentError;
use crate::file_utils::FileManager;
use crate::registry::RecipientRecord;
use crate::splitter::OutputArtifact;

/// Everything destined for one recipient after a run
#[derive(Debug, Clone)]
pub struct AttachmentSet {
    /// Registry id of the recipient
    pub recipient_id: i64,
    /// Display name of the recipient
    pub recipient_name: String,
    /// Delivery address, when the registry has one
    pub email: Option<String>,
    /// Split artifacts plus validated extra files
    pub files: Vec<PathBuf>,
}

/// Validates and groups attachment files per recipient
#[derive(Debug, Clone)]
pub struct AttachmentMatcher {
    allowed_extensions: HashSet<String>,
}

impl AttachmentMatcher {
    /// Matcher using the configured global whitelist
    pub fn from_config(config: &AttachmentConfig) -> Self {
        AttachmentMatcher {
            allowed_extensions: Self::normalize_extensions(&config.allowed_extensions),
        }
    }

    /// Lowercases and strips leading dots from a whitelist
    fn normalize_extensions(extensions: &[String]) -> HashSet<String> {
        extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    /// Whitelist in effect for one recipient
    // @checks: a per-recipient override replaces the global whitelist entirely
    fn effective_extensions(&self, recipient: &RecipientRecord) -> HashSet<String> {
        match &recipient.allowed_extensions {
            Some(overrides) => Self::normalize_extensions(overrides),
            None => self.allowed_extensions.clone(),
        }
    }

    /// Whether a file may be attached for a recipient
    pub fn is_allowed(&self, path: &Path, recipient: &RecipientRecord) -> bool {
        match FileManager::file_extension(path) {
            Some(ext) => self.effective_extensions(recipient).contains(&ext),
            None => false,
        }
    }

    /// Pair a recipient's artifacts with validated extra files
    ///
    /// # Arguments
    ///
    /// * `recipient` - Registry record the set is assembled for
    /// * `artifacts` - All artifacts written during the run
    /// * `extras` - Additional files requested for this recipient
    ///
    /// # Returns
    ///
    /// * `Result<AttachmentSet, AttachmentError>` - The assembled set, or the
    ///   first missing or unsupported extra encountered
    pub fn pair(
        &self,
        recipient: &RecipientRecord,
        artifacts: &[OutputArtifact],
        extras: &[PathBuf],
    ) -> Result<AttachmentSet, AttachmentError> {
        let mut files: Vec<PathBuf> = artifacts
            .iter()
            .filter(|a| a.recipient_id == recipient.id)
            .map(|a| a.path.clone())
            .collect();

        let allowed = self.effective_extensions(recipient);
        for extra in extras {
            if !FileManager::file_exists(extra) {
                return Err(AttachmentError::Missing(extra.clone()));
            }
            let extension = FileManager::file_extension(extra).unwrap_or_default();
            if !allowed.contains(&extension) {
                return Err(AttachmentError::UnsupportedExtension {
                    path: extra.clone(),
                    extension,
                });
            }
            files.push(extra.clone());
        }

        debug!(
            "Paired {} files for recipient '{}'",
            files.len(),
            recipient.name
        );

        Ok(AttachmentSet {
            recipient_id: recipient.id,
            recipient_name: recipient.name.clone(),
            email: recipient.email.clone(),
            files,
        })
    }

    /// Collect whitelisted files from an import directory
    pub fn scan_import_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let extensions: Vec<&str> = self.allowed_extensions.iter().map(|e| e.as_str()).collect();
        let mut found = FileManager::find_files(dir, &extensions)?;
        found.sort();
        Ok(found)
    }
}
