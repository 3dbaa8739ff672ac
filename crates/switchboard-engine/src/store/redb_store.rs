//! redb-backed byte store.
//!
//! One table maps storage keys to record bytes. redb's API is
//! blocking, so every transaction runs under `spawn_blocking`.

use crate::store::ByteStore;
use async_trait::async_trait;
use redb::{Database, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use switchboard_common::StoreError;

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a store at the given path. Missing parent
    /// directories are created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path).map_err(backend)?;

        // Ensure the table exists so later reads cannot fail on a
        // fresh database.
        let write_txn = db.begin_write().map_err(backend)?;
        {
            let _ = write_txn.open_table(RECORDS).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl ByteStore for RedbStore {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, StoreError> {
        let db = self.db.clone();
        let keys = keys.to_vec();
        tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read().map_err(backend)?;
            let table = read_txn.open_table(RECORDS).map_err(backend)?;
            let mut values = Vec::with_capacity(keys.len());
            for key in &keys {
                let value = table.get(key.as_str()).map_err(backend)?;
                values.push(value.map(|v| v.value().to_vec()));
            }
            Ok(values)
        })
        .await?
    }

    async fn mset(&self, pairs: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(backend)?;
            {
                let mut table = write_txn.open_table(RECORDS).map_err(backend)?;
                for (key, value) in &pairs {
                    table
                        .insert(key.as_str(), value.as_slice())
                        .map_err(backend)?;
                }
            }
            write_txn.commit().map_err(backend)?;
            Ok(())
        })
        .await?
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let db = self.db.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read().map_err(backend)?;
            let table = read_txn.open_table(RECORDS).map_err(backend)?;
            let mut keys = Vec::new();
            for entry in table.range(prefix.as_str()..).map_err(backend)? {
                let (key, _) = entry.map_err(backend)?;
                let key = key.value();
                if !key.starts_with(&prefix) {
                    break;
                }
                keys.push(key.to_string());
            }
            Ok(keys)
        })
        .await?
    }

    async fn mdelete(&self, keys: &[String]) -> Result<(), StoreError> {
        let db = self.db.clone();
        let keys = keys.to_vec();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(backend)?;
            {
                let mut table = write_txn.open_table(RECORDS).map_err(backend)?;
                for key in &keys {
                    table.remove(key.as_str()).map_err(backend)?;
                }
            }
            write_txn.commit().map_err(backend)?;
            Ok(())
        })
        .await?
    }
}
