//! Store module for persisting harvested hadiths
//!
//! This module handles all database access for the harvester:
//! - Connecting to the configured backend (PostgreSQL or SQLite)
//! - The liveness round trip performed at startup
//! - Inserting one row per record and reading back the inserted row
//! - Counting rows per book for `--stats`
//! - Reading a book's rows back one page at a time for `--list`
//!
//! The target table is assumed to exist; it is never created or migrated.

mod postgres;
mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::harvest::HadithRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid server timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Store connection already closed")]
    Closed,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A row as returned by the store after an insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StoredHadith {
    pub book_id: i32,
    pub number: String,
    pub arabic: String,
    pub indonesian: String,
}

/// One page of a book's stored rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HadithPage {
    pub book_id: i32,
    /// Rows ordered by hadith number
    pub items: Vec<StoredHadith>,
    pub limit: u32,
    pub offset: u32,
    /// Number of rows stored for the book, across all pages
    pub total: u64,
}

/// Trait for relational store backends
///
/// Implementations must tolerate concurrent `insert` calls from the same
/// task; the harvest loop issues all inserts of a page at once.
#[async_trait]
pub trait HadithStore: Send + Sync {
    /// Performs a trivial round trip and returns the server's current time
    async fn ping(&self) -> StoreResult<DateTime<Utc>>;

    /// Inserts one record and returns the inserted row
    ///
    /// Fields are bound positionally as (book_id, number, arabic, indonesian).
    async fn insert(&self, record: &HadithRecord) -> StoreResult<StoredHadith>;

    /// Counts the rows stored for a book
    async fn count_by_book(&self, book_id: i32) -> StoreResult<u64>;

    /// Reads up to `limit` rows of a book, skipping the first `offset`
    ///
    /// Rows are ordered numerically by their digit-only `number`.
    async fn find_by_book(
        &self,
        book_id: i32,
        offset: u32,
        limit: u32,
    ) -> StoreResult<HadithPage>;

    /// Closes the connection; later calls fail with [`StoreError::Closed`]
    async fn close(&self) -> StoreResult<()>;
}

#[async_trait]
impl<T: HadithStore + ?Sized> HadithStore for Box<T> {
    async fn ping(&self) -> StoreResult<DateTime<Utc>> {
        (**self).ping().await
    }

    async fn insert(&self, record: &HadithRecord) -> StoreResult<StoredHadith> {
        (**self).insert(record).await
    }

    async fn count_by_book(&self, book_id: i32) -> StoreResult<u64> {
        (**self).count_by_book(book_id).await
    }

    async fn find_by_book(
        &self,
        book_id: i32,
        offset: u32,
        limit: u32,
    ) -> StoreResult<HadithPage> {
        (**self).find_by_book(book_id, offset, limit).await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }
}

/// Opens the store selected by `config.backend`
///
/// No query is issued; call [`HadithStore::ping`] to confirm the store is
/// reachable.
pub async fn connect(config: &StoreConfig) -> StoreResult<Box<dyn HadithStore>> {
    match config.backend {
        StoreBackend::Postgres => Ok(Box::new(PostgresStore::connect(config).await?)),
        StoreBackend::Sqlite => Ok(Box::new(SqliteStore::open(
            Path::new(&config.database),
            &config.table,
        )?)),
    }
}

/// Builds the insert statement for `table`
///
/// `placeholders` are the four bind markers of the backend, in column order.
fn insert_statement(table: &str, placeholders: [&str; 4]) -> String {
    format!(
        "INSERT INTO {} (book_id, number, arabic, indonesian) VALUES ({}, {}, {}, {}) RETURNING *",
        table, placeholders[0], placeholders[1], placeholders[2], placeholders[3]
    )
}

/// Builds the per-book count statement for `table`
fn count_statement(table: &str, placeholder: &str) -> String {
    format!("SELECT COUNT(*) FROM {} WHERE book_id = {}", table, placeholder)
}

/// Builds the paginated per-book select for `table`
///
/// `placeholders` bind (book_id, limit, offset). Numbers are digit strings,
/// so ordering by length first gives numeric order.
fn page_statement(table: &str, placeholders: [&str; 3]) -> String {
    format!(
        "SELECT book_id, number, arabic, indonesian FROM {} WHERE book_id = {} \
         ORDER BY LENGTH(number), number LIMIT {} OFFSET {}",
        table, placeholders[0], placeholders[1], placeholders[2]
    )
}
