//! SQLite-backed identity record store
//!
//! One table, eight text columns, primary key on the identity number. The
//! uniqueness constraint is the duplicate guard: a second capture of the
//! same card surfaces as [`StoreError::Duplicate`] and leaves the stored
//! row untouched.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::analysis::fields::IdentityRecord;

/// Errors surfaced by the record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this identity number is already stored
    #[error("identity number {identity_number} is already stored")]
    Duplicate { identity_number: String },
    /// The record is missing required fields and cannot be persisted
    #[error("record is incomplete: missing {0}")]
    Incomplete(String),
    /// Underlying database failure
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Persistent store for completed identity records
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) the store at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!("Opened record store at {:?}", path);
        Self::init(conn)
    }

    /// Open an in-memory store (useful for tests and dry runs)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Create the schema if it does not exist yet; fixed thereafter
    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                name            TEXT NOT NULL,
                father_name     TEXT NOT NULL,
                gender          TEXT NOT NULL,
                country_of_stay TEXT NOT NULL,
                identity_number TEXT PRIMARY KEY,
                date_of_birth   TEXT NOT NULL,
                date_of_issue   TEXT NOT NULL,
                date_of_expiry  TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Insert a completed record.
    ///
    /// Completeness is the caller's responsibility, but the boundary is
    /// guarded anyway: an incomplete record is rejected before touching the
    /// database. An existing record with the same identity number is never
    /// overwritten.
    pub fn insert(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Err(StoreError::Incomplete(missing.join(", ")));
        }

        let identity_number = record.identity_number.as_deref().unwrap_or_default();

        let result = self.conn.execute(
            "INSERT INTO records (
                name, father_name, gender, country_of_stay,
                identity_number, date_of_birth, date_of_issue, date_of_expiry
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.name,
                record.father_name,
                record.gender,
                record.country_of_stay,
                record.identity_number,
                record.date_of_birth,
                record.date_of_issue,
                record.date_of_expiry,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Duplicate {
                    identity_number: identity_number.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a record by identity number
    pub fn get(&self, identity_number: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT name, father_name, gender, country_of_stay,
                        identity_number, date_of_birth, date_of_issue, date_of_expiry
                 FROM records WHERE identity_number = ?1",
                params![identity_number],
                |row| {
                    Ok(IdentityRecord {
                        name: row.get(0)?,
                        father_name: row.get(1)?,
                        gender: row.get(2)?,
                        country_of_stay: row.get(3)?,
                        identity_number: row.get(4)?,
                        date_of_birth: row.get(5)?,
                        date_of_issue: row.get(6)?,
                        date_of_expiry: row.get(7)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    /// Number of stored records
    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
