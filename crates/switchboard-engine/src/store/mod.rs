//! Byte-level storage backends for conversation history.
//!
//! The store knows nothing about messages. It maps string keys to JSON
//! record bytes; [`crate::History`] owns the key scheme and the codec.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use async_trait::async_trait;
use switchboard_common::StoreError;

#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Fetch many values at once. The result has one slot per requested
    /// key, `None` where the key does not exist.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, StoreError>;

    /// Write many key/value pairs at once.
    async fn mset(&self, pairs: Vec<(String, Vec<u8>)>) -> Result<(), StoreError>;

    /// Every key starting with `prefix`, in unspecified order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Delete many keys at once. Missing keys are ignored.
    async fn mdelete(&self, keys: &[String]) -> Result<(), StoreError>;
}
