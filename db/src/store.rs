//! Key-value persistence used by the attendance services.
//!
//! Every key maps to a list of JSON records. Writes replace the whole list
//! (last write wins); there are no transactions across keys.

use crate::models::kv_record::{self, Entity as KvRecord};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, Schema, TransactionTrait,
};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("stored value is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("update of `{0}` was not applied")]
    UpdateNotApplied(String),
}

/// Rewrites the records under one key. Receives the current list (empty when
/// the key is absent) and returns the list to store.
pub type UpdateFn<'a> =
    Box<dyn FnOnce(Vec<Value>) -> Result<Vec<Value>, StoreError> + Send + 'a>;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the records under `key`, or an empty list when the key is absent.
    async fn get(&self, key: &str) -> Result<Vec<Value>, StoreError>;

    /// Replaces the records under `key`.
    async fn set(&self, key: &str, records: Vec<Value>) -> Result<(), StoreError>;

    async fn contains(&self, key: &str) -> Result<bool, StoreError>;

    /// Applies `f` to the records under `key` with no other write to `key`
    /// in between. `f` is called exactly once; when it fails nothing is written.
    async fn update(&self, key: &str, f: UpdateFn<'_>) -> Result<(), StoreError>;
}

/// Process-local store. Contents are lost when dropped.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self.inner.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn set(&self, key: &str, records: Vec<Value>) -> Result<(), StoreError> {
        self.inner.write().await.insert(key.to_owned(), records);
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.contains_key(key))
    }

    async fn update(&self, key: &str, f: UpdateFn<'_>) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let current = guard.get(key).cloned().unwrap_or_default();
        let next = f(current)?;
        guard.insert(key.to_owned(), next);
        Ok(())
    }
}

/// SQLite-backed store: one `kv_records` row per key.
#[derive(Clone)]
pub struct SqliteStore {
    db: DatabaseConnection,
}

impl SqliteStore {
    /// Connects to `url` and creates the `kv_records` table if it is missing.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let mut opts = ConnectOptions::new(url.to_owned());
        // In-memory databases are per connection.
        opts.max_connections(1).sqlx_logging(false);

        let db = Database::connect(opts).await?;
        let store = Self { db };
        store.ensure_schema().await?;
        log::debug!("key-value store ready at {url}");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);
        let mut stmt = schema.create_table_from_entity(KvRecord);
        stmt.if_not_exists();
        self.db.execute(backend.build(&stmt)).await?;
        Ok(())
    }
}

async fn read_records<C: ConnectionTrait>(conn: &C, key: &str) -> Result<Vec<Value>, StoreError> {
    match KvRecord::find_by_id(key.to_owned()).one(conn).await? {
        Some(row) => Ok(serde_json::from_str(&row.value)?),
        None => Ok(Vec::new()),
    }
}

async fn write_records<C: ConnectionTrait>(
    conn: &C,
    key: &str,
    records: &[Value],
) -> Result<(), StoreError> {
    let row = kv_record::ActiveModel {
        key: Set(key.to_owned()),
        value: Set(serde_json::to_string(records)?),
        updated_at: Set(Utc::now()),
    };

    KvRecord::insert(row)
        .on_conflict(
            OnConflict::column(kv_record::Column::Key)
                .update_columns([kv_record::Column::Value, kv_record::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Vec<Value>, StoreError> {
        read_records(&self.db, key).await
    }

    async fn set(&self, key: &str, records: Vec<Value>) -> Result<(), StoreError> {
        write_records(&self.db, key, &records).await
    }

    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(KvRecord::find_by_id(key.to_owned())
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn update(&self, key: &str, f: UpdateFn<'_>) -> Result<(), StoreError> {
        // Dropping the transaction on error rolls it back.
        let txn = self.db.begin().await?;
        let current = read_records(&txn, key).await?;
        let next = f(current)?;
        write_records(&txn, key, &next).await?;
        txn.commit().await?;
        Ok(())
    }
}
