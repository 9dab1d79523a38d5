//! SQLite store implementation

use crate::harvest::HadithRecord;
use crate::store::{
    count_statement, insert_statement, page_statement, HadithPage, HadithStore, StoreError,
    StoreResult, StoredHadith,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite store backend
///
/// The connection is serialized behind a mutex, so the concurrent inserts of
/// a page reach the database one at a time.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    insert_sql: String,
    count_sql: String,
    page_sql: String,
}

impl SqliteStore {
    /// Opens the existing database file at `path`
    ///
    /// A missing file is an error rather than a new empty database.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `table` - Name of the pre-existing hadith table
    pub fn open(path: &Path, table: &str) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        Ok(Self::from_connection(conn, table))
    }

    /// Wraps an already opened connection
    pub fn from_connection(conn: Connection, table: &str) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            insert_sql: insert_statement(table, ["?1", "?2", "?3", "?4"]),
            count_sql: count_statement(table, "?1"),
            page_sql: page_statement(table, ["?1", "?2", "?3"]),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        // A panic while holding the lock leaves the connection usable
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn stored_hadith(row: &Row<'_>) -> rusqlite::Result<StoredHadith> {
    Ok(StoredHadith {
        book_id: row.get("book_id")?,
        number: row.get("number")?,
        arabic: row.get("arabic")?,
        indonesian: row.get("indonesian")?,
    })
}

#[async_trait]
impl HadithStore for SqliteStore {
    async fn ping(&self) -> StoreResult<DateTime<Utc>> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let now: String = conn.query_row("SELECT CURRENT_TIMESTAMP", [], |row| row.get(0))?;
        let naive = NaiveDateTime::parse_from_str(&now, "%Y-%m-%d %H:%M:%S")?;
        Ok(Utc.from_utc_datetime(&naive))
    }

    async fn insert(&self, record: &HadithRecord) -> StoreResult<StoredHadith> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let stored = conn.query_row(
            &self.insert_sql,
            params![
                record.book_id,
                record.number,
                record.arabic_text,
                record.translated_text
            ],
            stored_hadith,
        )?;

        Ok(stored)
    }

    async fn count_by_book(&self, book_id: i32) -> StoreResult<u64> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let count: i64 = conn.query_row(&self.count_sql, params![book_id], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn find_by_book(
        &self,
        book_id: i32,
        offset: u32,
        limit: u32,
    ) -> StoreResult<HadithPage> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let total: i64 = conn.query_row(&self.count_sql, params![book_id], |row| row.get(0))?;
        let mut stmt = conn.prepare_cached(&self.page_sql)?;
        let items = stmt
            .query_map(
                params![book_id, i64::from(limit), i64::from(offset)],
                stored_hadith,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HadithPage {
            book_id,
            items,
            limit,
            offset,
            total: total as u64,
        })
    }

    async fn close(&self) -> StoreResult<()> {
        let conn = self.lock().take().ok_or(StoreError::Closed)?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}
