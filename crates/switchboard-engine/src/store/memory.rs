//! In-memory byte store, for tests and ephemeral runs.

use crate::store::ByteStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use switchboard_common::StoreError;
use tokio::sync::RwLock;

pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteStore for MemoryStore {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, StoreError> {
        let records = self.records.read().await;
        Ok(keys.iter().map(|key| records.get(key).cloned()).collect())
    }

    async fn mset(&self, pairs: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        for (key, value) in pairs {
            records.insert(key, value);
        }
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn mdelete(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        for key in keys {
            records.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mget_keeps_one_slot_per_key() {
        let store = MemoryStore::new();
        store
            .mset(vec![("a".into(), b"1".to_vec()), ("c".into(), b"3".to_vec())])
            .await
            .unwrap();

        let values = store
            .mget(&["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].as_deref(), Some(b"1".as_slice()));
        assert_eq!(values[1], None);
        assert_eq!(values[2].as_deref(), Some(b"3".as_slice()));
    }

    #[tokio::test]
    async fn mset_overwrites_existing_values() {
        let store = MemoryStore::new();
        store.mset(vec![("k".into(), b"old".to_vec())]).await.unwrap();
        store.mset(vec![("k".into(), b"new".to_vec())]).await.unwrap();

        let values = store.mget(&["k".into()]).await.unwrap();
        assert_eq!(values[0].as_deref(), Some(b"new".as_slice()));
    }

    #[tokio::test]
    async fn list_keys_respects_prefix() {
        let store = MemoryStore::new();
        store
            .mset(vec![
                ("conv-a:1".into(), b"x".to_vec()),
                ("conv-a:2".into(), b"y".to_vec()),
                ("conv-b:1".into(), b"z".to_vec()),
            ])
            .await
            .unwrap();

        let keys = store.list_keys("conv-a:").await.unwrap();
        assert_eq!(keys, vec!["conv-a:1".to_string(), "conv-a:2".to_string()]);
    }

    #[tokio::test]
    async fn mdelete_ignores_missing_keys() {
        let store = MemoryStore::new();
        store.mset(vec![("a".into(), b"1".to_vec())]).await.unwrap();
        store.mdelete(&["a".into(), "ghost".into()]).await.unwrap();

        let keys = store.list_keys("").await.unwrap();
        assert!(keys.is_empty());
    }
}
