//! SQLite-backed record store.
//!
//! All collections share one `records` table keyed by
//! `(collection, record_key)`; bodies are JSON text. A batch runs inside one
//! SQLite transaction, so a failed op rolls back everything before it.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};
use tracing::instrument;

use super::r#trait::{Collection, RecordKey, RecordStore, StoreError, StoredRecord, WriteBatch, WriteOp};

/// SQLite record store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    ///
    /// `sqlite::memory:` databases live per connection, so they get a single
    /// pooled connection that is never recycled.
    #[instrument(err)]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_url", e))?
            .create_if_missing(true);

        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .idle_timeout(if in_memory { None } else { Some(std::time::Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(std::time::Duration::from_secs(1800)) })
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT    NOT NULL,
                record_key TEXT    NOT NULL,
                revision   INTEGER NOT NULL,
                body       TEXT    NOT NULL,
                PRIMARY KEY (collection, record_key)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| map_sqlx_error("create_schema", e))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_row(collection: Collection, row: &sqlx::sqlite::SqliteRow) -> Result<StoredRecord, StoreError> {
    let raw_key: String = row
        .try_get("record_key")
        .map_err(|e| map_sqlx_error("decode_row", e))?;
    let revision: i64 = row
        .try_get("revision")
        .map_err(|e| map_sqlx_error("decode_row", e))?;
    let body: String = row.try_get("body").map_err(|e| map_sqlx_error("decode_row", e))?;

    Ok(StoredRecord {
        key: RecordKey::parse(collection, &raw_key)?,
        revision: u64::try_from(revision)
            .map_err(|_| StoreError::InvalidRecord(format!("{collection}/{raw_key}: negative revision")))?,
        body: serde_json::from_str(&body)
            .map_err(|e| StoreError::Serialization(format!("{collection}/{raw_key}: {e}")))?,
    })
}

async fn current_revision(
    tx: &mut Transaction<'_, Sqlite>,
    collection: Collection,
    key: &RecordKey,
) -> Result<u64, StoreError> {
    let row = sqlx::query("SELECT revision FROM records WHERE collection = ?1 AND record_key = ?2")
        .bind(collection.name())
        .bind(key.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("current_revision", e))?;

    match row {
        Some(row) => {
            let revision: i64 = row
                .try_get("revision")
                .map_err(|e| map_sqlx_error("current_revision", e))?;
            Ok(u64::try_from(revision).unwrap_or(0))
        }
        None => Ok(0),
    }
}

async fn apply(tx: &mut Transaction<'_, Sqlite>, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Put {
            collection,
            expected,
            body,
        } => {
            let key = RecordKey::from_body(collection, &body)?;
            let current = current_revision(tx, collection, &key).await?;
            if !expected.matches(current) {
                return Err(StoreError::revision_mismatch(collection, &key, expected, current));
            }

            let text = serde_json::to_string(&body)
                .map_err(|e| StoreError::Serialization(format!("{collection}/{key}: {e}")))?;
            let next = i64::try_from(current + 1)
                .map_err(|_| StoreError::InvalidRecord(format!("{collection}/{key}: revision overflow")))?;

            sqlx::query(
                r#"
                INSERT INTO records (collection, record_key, revision, body)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (collection, record_key)
                DO UPDATE SET revision = excluded.revision, body = excluded.body
                "#,
            )
            .bind(collection.name())
            .bind(key.to_string())
            .bind(next)
            .bind(text)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("put", e))?;
        }
        WriteOp::Delete {
            collection,
            key,
            expected,
        } => {
            let current = current_revision(tx, collection, &key).await?;
            if !expected.matches(current) {
                return Err(StoreError::revision_mismatch(collection, &key, expected, current));
            }

            sqlx::query("DELETE FROM records WHERE collection = ?1 AND record_key = ?2")
                .bind(collection.name())
                .bind(key.to_string())
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("delete", e))?;
        }
        WriteOp::Clear { collection } => {
            sqlx::query("DELETE FROM records WHERE collection = ?1")
                .bind(collection.name())
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("clear", e))?;
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, collection: Collection, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT record_key, revision, body FROM records WHERE collection = ?1 AND record_key = ?2",
        )
        .bind(collection.name())
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|row| decode_row(collection, &row)).transpose()
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StoreError> {
        let rows = sqlx::query("SELECT record_key, revision, body FROM records WHERE collection = ?1")
            .bind(collection.name())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        let mut records = rows
            .iter()
            .map(|row| decode_row(collection, row))
            .collect::<Result<Vec<_>, _>>()?;
        // Text keys sort "10" before "2"; order by the typed key instead.
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    #[instrument(skip(self, batch), fields(ops = batch.len()), err)]
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for op in batch.into_ops() {
            if let Err(err) = apply(&mut tx, op).await {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(err);
            }
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            // SQLITE_BUSY / SQLITE_LOCKED: another writer got there first.
            match db_err.code().as_deref() {
                Some("5") | Some("6") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
