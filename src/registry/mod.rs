/*!
 * Recipient registry.
 *
 * Recipients live in a SQLite store managed by [`store::RegistryStore`]. A run
 * never reads the store directly: it takes a [`RegistrySnapshot`] up front and
 * matches against that, so registry edits made while a run is in flight cannot
 * change its outcome.
 */

pub mod store;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::file_utils::FileManager;

/// One registered payout recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientRecord {
    /// Stable registry id
    pub id: i64,
    /// Canonical display name, the primary matching key
    pub name: String,
    /// Delivery address for downstream tooling
    pub email: Option<String>,
    /// Free-form organizational unit
    pub department: Option<String>,
    /// Alternate names that participate in the synonym strategy
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Per-recipient attachment whitelist overriding the global one
    #[serde(default)]
    pub allowed_extensions: Option<Vec<String>>,
    /// Inactive recipients are kept for history but never matched
    #[serde(default = "default_active")]
    pub active: bool,
}

impl RecipientRecord {
    /// A minimal record with just an id and name
    pub fn named(id: i64, name: &str) -> Self {
        RecipientRecord {
            id,
            name: name.to_string(),
            email: None,
            department: None,
            aliases: Vec::new(),
            allowed_extensions: None,
            active: true,
        }
    }
}

fn default_active() -> bool {
    true
}

/// Immutable view of the registry taken at the start of a run
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    recipients: Arc<Vec<RecipientRecord>>,
}

impl RegistrySnapshot {
    /// Wrap a list of records into a snapshot
    pub fn new(recipients: Vec<RecipientRecord>) -> Self {
        RegistrySnapshot {
            recipients: Arc::new(recipients),
        }
    }

    /// Snapshot from bare names, ids assigned in order from 1
    pub fn from_names(names: &[&str]) -> Self {
        let recipients = names
            .iter()
            .enumerate()
            .map(|(index, name)| RecipientRecord::named(index as i64 + 1, name))
            .collect();
        Self::new(recipients)
    }

    /// Snapshot from a plain text roster file, one name per line
    // @returns: blank lines and duplicate names are skipped
    pub fn from_roster_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)
            .with_context(|| format!("Failed to read roster: {:?}", path))?;

        let mut seen = std::collections::HashSet::new();
        let mut recipients = Vec::new();
        for line in content.lines() {
            let name = line.trim();
            if name.is_empty() || !seen.insert(name.to_lowercase()) {
                continue;
            }
            recipients.push(RecipientRecord::named(recipients.len() as i64 + 1, name));
        }

        if recipients.is_empty() {
            return Err(anyhow!("Roster contains no recipients: {:?}", path));
        }
        Ok(Self::new(recipients))
    }

    /// All records, including inactive ones
    pub fn recipients(&self) -> &[RecipientRecord] {
        &self.recipients
    }

    /// Records that participate in matching
    pub fn active(&self) -> impl Iterator<Item = &RecipientRecord> {
        self.recipients.iter().filter(|r| r.active)
    }

    /// Number of active records
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Look up a record by id
    pub fn get(&self, id: i64) -> Option<&RecipientRecord> {
        self.recipients.iter().find(|r| r.id == id)
    }

    /// Total record count
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    /// Whether the snapshot holds no records
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}
