//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::{CrawlSummary, DetailRecord};
use crate::storage::RunRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// A record store is keyed by identifier: upserting the same identifier
/// twice replaces the stored fields instead of duplicating the row, which
/// is what makes repeated crawl runs over overlapping identifier sets safe.
pub trait RecordStore {
    // ===== Record Management =====

    /// Inserts a record, or replaces the existing record with the same
    /// identifier
    fn upsert_record(&mut self, record: &DetailRecord) -> StorageResult<()>;

    /// Gets a record by identifier
    fn get_record(&self, identifier: &str) -> StorageResult<Option<DetailRecord>>;

    /// Counts stored records
    fn count_records(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file the run started with
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed, recording its final counts
    fn complete_run(&mut self, run_id: i64, summary: &CrawlSummary) -> StorageResult<()>;

    /// Marks a run as failed, recording whatever counts it reached
    fn fail_run(&mut self, run_id: i64, summary: &CrawlSummary) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
