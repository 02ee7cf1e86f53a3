//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::crawler::{CrawlSummary, DetailRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::ScoutError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(ScoutError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ScoutError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, ScoutError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        attempted: row.get(5)?,
        stored: row.get(6)?,
        failed: row.get(7)?,
    })
}

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, attempted, stored, failed";

impl RecordStore for SqliteStore {
    // ===== Record Management =====

    fn upsert_record(&mut self, record: &DetailRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO records (identifier, name, time, stored_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identifier) DO UPDATE SET
                 name = excluded.name,
                 time = excluded.time,
                 stored_at = excluded.stored_at",
            params![record.identifier, record.name, record.time, now],
        )?;
        Ok(())
    }

    fn get_record(&self, identifier: &str) -> StorageResult<Option<DetailRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT identifier, name, time FROM records WHERE identifier = ?1",
                params![identifier],
                |row| {
                    Ok(DetailRecord {
                        identifier: row.get(0)?,
                        name: row.get(1)?,
                        time: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, summary: &CrawlSummary) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed, summary)
    }

    fn fail_run(&mut self, run_id: i64, summary: &CrawlSummary) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Failed, summary)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs WHERE id = ?1",
            RUN_COLUMNS
        ))?;

        let run = stmt
            .query_row(params![run_id], row_to_run)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::RunNotFound(run_id),
                other => StorageError::Sqlite(other),
            })?;

        Ok(run)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt.query_row([], row_to_run).optional()?;

        Ok(run)
    }
}

impl SqliteStore {
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &CrawlSummary,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, attempted = ?3, stored = ?4,
             failed = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                summary.attempted,
                summary.stored,
                summary.failed,
                run_id
            ],
        )?;
        Ok(())
    }
}
