//! PostgreSQL store implementation

use crate::config::StoreConfig;
use crate::harvest::HadithRecord;
use crate::store::{
    count_statement, insert_statement, page_statement, HadithPage, HadithStore, StoreError,
    StoreResult, StoredHadith,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// PostgreSQL store backend
pub struct PostgresStore {
    pool: PgPool,
    insert_sql: String,
    count_sql: String,
    page_sql: String,
}

impl PostgresStore {
    /// Connects to the server described by `config`
    ///
    /// The pool opens its first connection eagerly, so an unreachable server
    /// or bad credentials fail here.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        tracing::debug!(
            "Connected to postgres://{}@{}:{}/{}",
            config.user,
            config.host,
            config.port,
            config.database
        );

        Ok(Self::from_pool(pool, &config.table))
    }

    /// Wraps an already connected pool
    pub fn from_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            insert_sql: insert_statement(table, ["$1", "$2", "$3", "$4"]),
            count_sql: count_statement(table, "$1"),
            page_sql: page_statement(table, ["$1", "$2", "$3"]),
        }
    }

    fn pool(&self) -> StoreResult<&PgPool> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(&self.pool)
    }
}

#[async_trait]
impl HadithStore for PostgresStore {
    async fn ping(&self) -> StoreResult<DateTime<Utc>> {
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()")
            .fetch_one(self.pool()?)
            .await?;
        Ok(now)
    }

    async fn insert(&self, record: &HadithRecord) -> StoreResult<StoredHadith> {
        let stored = sqlx::query_as::<_, StoredHadith>(&self.insert_sql)
            .bind(record.book_id)
            .bind(&record.number)
            .bind(&record.arabic_text)
            .bind(&record.translated_text)
            .fetch_one(self.pool()?)
            .await?;
        Ok(stored)
    }

    async fn count_by_book(&self, book_id: i32) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(&self.count_sql)
            .bind(book_id)
            .fetch_one(self.pool()?)
            .await?;
        Ok(count as u64)
    }

    async fn find_by_book(
        &self,
        book_id: i32,
        offset: u32,
        limit: u32,
    ) -> StoreResult<HadithPage> {
        let total = self.count_by_book(book_id).await?;
        let items = sqlx::query_as::<_, StoredHadith>(&self.page_sql)
            .bind(book_id)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(self.pool()?)
            .await?;

        Ok(HadithPage {
            book_id,
            items,
            limit,
            offset,
            total,
        })
    }

    async fn close(&self) -> StoreResult<()> {
        self.pool()?.close().await;
        Ok(())
    }
}
