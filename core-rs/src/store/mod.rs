//! SQLite-backed assignment store.
//!
//! The store is the single source of truth for which ports are taken. Both
//! uniqueness rules (one port per (directory, service type) pair, one owner
//! per port) are enforced by UNIQUE constraints inside the engine, so a
//! concurrent invocation racing between our used-ports snapshot and our
//! insert loses at insert time instead of corrupting the table.
//!
//! Handles are constructed explicitly (`open`, `open_default`,
//! `open_in_memory`) and passed to callers; there is no process-wide
//! connection.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PortkeepError, Result};

/// Schema for the ports table. Safe to run on every startup.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    directory TEXT NOT NULL,
    service_type TEXT NOT NULL,
    port INTEGER NOT NULL CHECK (port BETWEEN 1 AND 65535),
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (directory, service_type),
    UNIQUE (port)
);

CREATE INDEX IF NOT EXISTS idx_ports_directory ON ports(directory);
CREATE INDEX IF NOT EXISTS idx_ports_service_type ON ports(service_type);
CREATE INDEX IF NOT EXISTS idx_ports_port ON ports(port);
";

const SELECT_COLUMNS: &str =
    "SELECT id, directory, service_type, port, description, created_at, updated_at FROM ports";

/// One persisted port assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRecord {
    pub id: i64,
    pub directory: String,
    pub service_type: String,
    pub port: u16,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<PortRecord> {
    Ok(PortRecord {
        id: row.get(0)?,
        directory: row.get(1)?,
        service_type: row.get(2)?,
        port: row.get(3)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Port assignment store backed by a per-user SQLite database.
pub struct PortStore {
    conn: Connection,
}

impl PortStore {
    /// Database path: ~/.config/portkeep/ports.db
    pub fn default_path() -> Result<PathBuf> {
        let home = env::var("HOME")
            .map_err(|_| PortkeepError::Config("HOME environment variable not set".to_string()))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("portkeep")
            .join("ports.db"))
    }

    /// Open the store at its per-user configuration path.
    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path()?)
    }

    /// Open (or create) the store at `path`. Parent directories are created
    /// if they don't exist; the schema is applied idempotently.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.execute_batch(SCHEMA)?;

        debug!(path = %path.display(), "opened port store");
        Ok(PortStore { conn })
    }

    /// Ephemeral in-memory store with the same schema. Intended for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(PortStore { conn })
    }

    /// Look up the record for a (directory, service type) pair.
    pub fn find(&self, directory: &str, service_type: &str) -> Result<Option<PortRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE directory = ?1 AND service_type = ?2"))?;
        let record = stmt
            .query_row(params![directory, service_type], record_from_row)
            .optional()?;
        Ok(record)
    }

    /// All records for a directory, port ascending.
    pub fn find_all_for_directory(&self, directory: &str) -> Result<Vec<PortRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE directory = ?1 ORDER BY port ASC"))?;
        let records = stmt
            .query_map(params![directory], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// All records across every project, port ascending.
    pub fn find_all(&self) -> Result<Vec<PortRecord>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY port ASC"))?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Snapshot of every port currently recorded.
    pub fn used_ports(&self) -> Result<HashSet<u16>> {
        let mut stmt = self.conn.prepare("SELECT port FROM ports")?;
        let ports = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<u16>>>()?;
        Ok(ports)
    }

    /// Insert a new assignment. A UNIQUE violation (duplicate
    /// (directory, service type) key or duplicate port) surfaces as
    /// `PortkeepError::Conflict`; the engine enforces both atomically.
    pub fn insert(
        &self,
        directory: &str,
        service_type: &str,
        port: u16,
        description: Option<&str>,
    ) -> Result<PortRecord> {
        let now = Utc::now().to_rfc3339();

        let inserted = self.conn.execute(
            "INSERT INTO ports (directory, service_type, port, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![directory, service_type, port, description, now, now],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, detail))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(PortkeepError::Conflict(
                    detail.unwrap_or_else(|| "uniqueness constraint violated".to_string()),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        debug!(directory, service_type, port, "recorded port assignment");
        Ok(PortRecord {
            id: self.conn.last_insert_rowid(),
            directory: directory.to_string(),
            service_type: service_type.to_string(),
            port,
            description: description.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Remove the record for a (directory, service type) pair, returning it.
    pub fn remove(&self, directory: &str, service_type: &str) -> Result<Option<PortRecord>> {
        let Some(record) = self.find(directory, service_type)? else {
            return Ok(None);
        };

        self.conn
            .execute("DELETE FROM ports WHERE id = ?1", params![record.id])?;

        debug!(directory, service_type, port = record.port, "removed port assignment");
        Ok(Some(record))
    }

    /// Remove every record for a directory, returning the removed records
    /// (port ascending).
    pub fn remove_all_for_directory(&self, directory: &str) -> Result<Vec<PortRecord>> {
        let records = self.find_all_for_directory(directory)?;
        if !records.is_empty() {
            self.conn
                .execute("DELETE FROM ports WHERE directory = ?1", params![directory])?;
            debug!(directory, count = records.len(), "removed all assignments for directory");
        }
        Ok(records)
    }
}
