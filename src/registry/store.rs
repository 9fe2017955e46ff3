/*!
 * SQLite-backed recipient store.
 *
 * A single long-lived connection behind a mutex, with blocking work moved off
 * the async runtime via spawn_blocking. The store owns schema creation and
 * versioning for its database file.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::RegistryError;
use crate::file_utils::FileManager;
use super::{RecipientRecord, RegistrySnapshot};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

const DEFAULT_DB_DIRNAME: &str = "paysplit";
const DEFAULT_DB_FILENAME: &str = "registry.db";

// Same shape check the registry UI used to apply: something@something.tld
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Counts reported by [`RegistryStore::stats`]
#[derive(Debug, Clone, Copy)]
pub struct RegistryStats {
    /// All recipients, active or not
    pub total_recipients: usize,
    /// Recipients that participate in matching
    pub active_recipients: usize,
    /// Stored aliases across all recipients
    pub alias_count: usize,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} recipients ({} active), {} aliases",
            self.total_recipients, self.active_recipients, self.alias_count
        )
    }
}

/// Recipient store over a SQLite database
pub struct RegistryStore {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl RegistryStore {
    /// Open the store at the platform default location
    pub fn new_default() -> Result<Self> {
        let db_path = Self::default_database_path()?;
        Self::new(db_path)
    }

    /// Open or create the store at a specific path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            FileManager::ensure_dir(parent)?;
        }

        info!("Opening registry database at: {:?}", db_path);
        let connection = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        Self::initialize_schema(&connection)?;

        Ok(RegistryStore {
            db_path,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Open an in-memory store, used by tests
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory registry database");
        let connection =
            Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::initialize_schema(&connection)?;

        Ok(RegistryStore {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Platform default database path
    pub fn default_database_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine a data directory for the registry"))?;
        Ok(data_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Add a recipient
    // @returns: the new registry id
    pub async fn add_recipient(
        &self,
        name: &str,
        email: Option<&str>,
        department: Option<&str>,
    ) -> Result<i64> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(anyhow!("Recipient name must not be empty"));
        }
        if let Some(email) = email {
            if !EMAIL_RE.is_match(email) {
                return Err(RegistryError::InvalidEmail(email.to_string()).into());
            }
        }

        let email = email.map(|e| e.to_string());
        let department = department.map(|d| d.to_string());
        self.execute_async(move |conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM recipients WHERE name = ?1",
                    params![name],
                    |row| row.get::<_, i64>(0),
                )
                .context("Failed to check for existing recipient")?
                > 0;
            if exists {
                return Err(RegistryError::Duplicate(name).into());
            }

            conn.execute(
                "INSERT INTO recipients (name, email, department) VALUES (?1, ?2, ?3)",
                params![name, email, department],
            )
            .context("Failed to insert recipient")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Remove a recipient and its aliases
    pub async fn remove_recipient(&self, name: &str) -> Result<()> {
        let name = name.trim().to_string();
        self.execute_async(move |conn| {
            let deleted = conn
                .execute("DELETE FROM recipients WHERE name = ?1", params![name])
                .context("Failed to delete recipient")?;
            if deleted == 0 {
                return Err(RegistryError::NotFound(name).into());
            }
            Ok(())
        })
        .await
    }

    /// All recipients, optionally including inactive ones
    pub async fn list_recipients(&self, include_inactive: bool) -> Result<Vec<RecipientRecord>> {
        self.execute_async(move |conn| Self::load_records(conn, include_inactive))
            .await
    }

    /// Look up a recipient by exact name
    pub async fn get_by_name(&self, name: &str) -> Result<Option<RecipientRecord>> {
        let name = name.trim().to_string();
        let records = self.list_recipients(true).await?;
        Ok(records.into_iter().find(|r| r.name == name))
    }

    /// Record an alternate name used by the synonym strategy
    pub async fn add_alias(&self, name: &str, alias: &str) -> Result<()> {
        let name = name.trim().to_string();
        let alias = alias.trim().to_string();
        if alias.is_empty() {
            return Err(anyhow!("Alias must not be empty"));
        }

        self.execute_async(move |conn| {
            let recipient_id = Self::recipient_id(conn, &name)?;
            conn.execute(
                "INSERT OR IGNORE INTO recipient_aliases (recipient_id, alias) VALUES (?1, ?2)",
                params![recipient_id, alias],
            )
            .context("Failed to insert alias")?;
            Ok(())
        })
        .await
    }

    /// Mark a recipient active or inactive
    pub async fn set_active(&self, name: &str, active: bool) -> Result<()> {
        let name = name.trim().to_string();
        self.execute_async(move |conn| {
            let updated = conn
                .execute(
                    "UPDATE recipients SET active = ?1, updated_at = datetime('now') WHERE name = ?2",
                    params![active as i64, name],
                )
                .context("Failed to update recipient")?;
            if updated == 0 {
                return Err(RegistryError::NotFound(name).into());
            }
            Ok(())
        })
        .await
    }

    /// Override the attachment whitelist for one recipient
    pub async fn set_allowed_extensions(
        &self,
        name: &str,
        extensions: Option<Vec<String>>,
    ) -> Result<()> {
        let name = name.trim().to_string();
        let encoded = match &extensions {
            Some(list) => Some(
                serde_json::to_string(list).context("Failed to encode extension list")?,
            ),
            None => None,
        };

        self.execute_async(move |conn| {
            let updated = conn
                .execute(
                    "UPDATE recipients SET allowed_extensions = ?1, updated_at = datetime('now') WHERE name = ?2",
                    params![encoded, name],
                )
                .context("Failed to update recipient")?;
            if updated == 0 {
                return Err(RegistryError::NotFound(name).into());
            }
            Ok(())
        })
        .await
    }

    /// Import a plain text roster, one name per line
    // @returns: number of recipients actually added
    pub async fn import_roster<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)
            .with_context(|| format!("Failed to read roster: {:?}", path))?;
        let names: Vec<String> = content
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        self.execute_async(move |conn| {
            let mut added = 0;
            for name in &names {
                let inserted = conn
                    .execute(
                        "INSERT OR IGNORE INTO recipients (name) VALUES (?1)",
                        params![name],
                    )
                    .context("Failed to insert roster entry")?;
                added += inserted;
            }
            Ok(added)
        })
        .await
    }

    /// Immutable snapshot of the whole registry for a run
    pub async fn snapshot(&self) -> Result<RegistrySnapshot> {
        let records = self.list_recipients(true).await?;
        Ok(RegistrySnapshot::new(records))
    }

    /// Counts for status output
    pub async fn stats(&self) -> Result<RegistryStats> {
        self.execute_async(|conn| {
            let total_recipients: i64 = conn
                .query_row("SELECT COUNT(*) FROM recipients", [], |row| row.get(0))
                .context("Failed to count recipients")?;
            let active_recipients: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM recipients WHERE active = 1",
                    [],
                    |row| row.get(0),
                )
                .context("Failed to count active recipients")?;
            let alias_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM recipient_aliases", [], |row| row.get(0))
                .context("Failed to count aliases")?;

            Ok(RegistryStats {
                total_recipients: total_recipients as usize,
                active_recipients: active_recipients as usize,
                alias_count: alias_count as usize,
            })
        })
        .await
    }

    // Run a blocking database operation off the async runtime
    async fn execute_async<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let conn = connection
                .lock()
                .map_err(|e| anyhow!("Failed to acquire database lock: {}", e))?;
            operation(&conn)
        })
        .await
        .context("Database task panicked")?
    }

    fn recipient_id(conn: &Connection, name: &str) -> Result<i64> {
        conn.query_row(
            "SELECT id FROM recipients WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .map_err(|_| RegistryError::NotFound(name.to_string()).into())
    }

    fn load_records(conn: &Connection, include_inactive: bool) -> Result<Vec<RecipientRecord>> {
        let sql = if include_inactive {
            "SELECT id, name, email, department, allowed_extensions, active FROM recipients ORDER BY name"
        } else {
            "SELECT id, name, email, department, allowed_extensions, active FROM recipients WHERE active = 1 ORDER BY name"
        };

        let mut statement = conn.prepare(sql).context("Failed to prepare query")?;
        let rows = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .context("Failed to query recipients")?;

        let mut aliases = Self::load_aliases(conn)?;
        let mut records = Vec::new();
        for row in rows {
            let (id, name, email, department, extensions_json, active) =
                row.context("Failed to read recipient row")?;
            let allowed_extensions = match extensions_json {
                Some(json) => Some(
                    serde_json::from_str(&json)
                        .with_context(|| format!("Corrupt extension list for '{}'", name))?,
                ),
                None => None,
            };
            records.push(RecipientRecord {
                id,
                name,
                email,
                department,
                aliases: aliases.remove(&id).unwrap_or_default(),
                allowed_extensions,
                active: active != 0,
            });
        }
        Ok(records)
    }

    fn load_aliases(conn: &Connection) -> Result<HashMap<i64, Vec<String>>> {
        let mut statement = conn
            .prepare("SELECT recipient_id, alias FROM recipient_aliases ORDER BY alias")
            .context("Failed to prepare alias query")?;
        let rows = statement
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .context("Failed to query aliases")?;

        let mut aliases: HashMap<i64, Vec<String>> = HashMap::new();
        for row in rows {
            let (recipient_id, alias) = row.context("Failed to read alias row")?;
            aliases.entry(recipient_id).or_default().push(alias);
        }
        Ok(aliases)
    }

    fn initialize_schema(conn: &Connection) -> Result<()> {
        // per-connection pragmas, needed on every open
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL mode")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .context("Failed to enable foreign keys")?;

        match Self::schema_version(conn)? {
            0 => {
                debug!("Creating registry schema version {}", SCHEMA_VERSION);
                Self::create_all_tables(conn)?;
                Self::set_schema_version(conn, SCHEMA_VERSION)
            }
            SCHEMA_VERSION => Ok(()),
            version => Err(anyhow!(
                "Unknown registry schema version {}, expected {}",
                version,
                SCHEMA_VERSION
            )),
        }
    }

    fn schema_version(conn: &Connection) -> Result<i32> {
        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .context("Failed to inspect schema")?
            > 0;
        if !table_exists {
            return Ok(0);
        }

        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .context("Failed to read schema version")
    }

    fn create_all_tables(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS recipients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                email TEXT,
                department TEXT,
                allowed_extensions TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_recipients_active ON recipients(active);

            CREATE TABLE IF NOT EXISTS recipient_aliases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_id INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
                alias TEXT NOT NULL,
                UNIQUE(recipient_id, alias)
            );

            CREATE INDEX IF NOT EXISTS idx_aliases_recipient ON recipient_aliases(recipient_id);

            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            "#,
        )
        .context("Failed to create registry tables")?;
        Ok(())
    }

    fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
            params![version],
        )
        .context("Failed to record schema version")?;
        Ok(())
    }
}
