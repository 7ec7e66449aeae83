//! Durable key-value storage for ledger state
//!
//! The ledger keeps two logical keys (usage events and cooldowns), each
//! holding a JSON document. Stores must make [`KvStore::update`] atomic with
//! respect to every other write on the same store so that concurrent routers
//! recording usage against a shared store never lose events.
//!
//! [`MemoryStore`] gives that guarantee within one instance. [`JsonFileStore`]
//! extends it to every store opened on the same directory, across processes,
//! through an advisory lock file; a writer that bypasses the store (or a
//! filesystem without working advisory locks) can still race it.
//!
//! # Example
//! ```ignore
//! let store = JsonFileStore::open("~/.switchyard/data").await?;
//! store.write("usage_events", serde_json::json!([])).await?;
//! ```

mod file;
mod memory;


pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::{SwitchyardError, SwitchyardResult};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

/// Read-modify-write closure applied by [`KvStore::update`].
///
/// Receives the current value (if any) and returns the value to store.
/// Returning an error aborts the update and leaves the stored value untouched.
pub type UpdateFn<'a> = dyn FnMut(Option<Value>) -> SwitchyardResult<Value> + Send + 'a;

/// Asynchronous key-value store holding JSON documents
#[async_trait]
pub trait KvStore: Send + Sync + Debug {
    /// Read the value stored under `key`
    async fn read(&self, key: &str) -> SwitchyardResult<Option<Value>>;

    /// Replace the value stored under `key`
    async fn write(&self, key: &str, value: Value) -> SwitchyardResult<()>;

    /// Remove `key`, returning whether it existed
    async fn remove(&self, key: &str) -> SwitchyardResult<bool>;

    /// Atomically read, transform and write the value stored under `key`
    async fn update(&self, key: &str, apply: &mut UpdateFn<'_>) -> SwitchyardResult<Value>;
}

/// Read a typed JSON document, falling back to `T::default()` when absent
pub async fn read_json<T>(store: &dyn KvStore, key: &str) -> SwitchyardResult<T>
where
    T: DeserializeOwned + Default,
{
    match store.read(key).await? {
        Some(value) => decode(key, value),
        None => Ok(T::default()),
    }
}

/// Write a typed JSON document
pub async fn write_json<T: Serialize>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> SwitchyardResult<()> {
    store.write(key, encode(key, value)?).await
}

/// Atomically transform a typed JSON document
///
/// The closure receives the decoded document (or `T::default()` when the key
/// is absent) and may mutate it in place; the result is written back.
pub async fn update_json<T, F, R>(store: &dyn KvStore, key: &str, mut f: F) -> SwitchyardResult<R>
where
    T: DeserializeOwned + Serialize + Default,
    F: FnMut(&mut T) -> R + Send,
    R: Send,
{
    let mut output = None;
    let mut apply = |current: Option<Value>| -> SwitchyardResult<Value> {
        let mut doc: T = match current {
            Some(value) => decode(key, value)?,
            None => T::default(),
        };
        output = Some(f(&mut doc));
        encode(key, &doc)
    };
    store.update(key, &mut apply).await?;
    output.ok_or_else(|| SwitchyardError::storage_with_key("update closure did not run", key))
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> SwitchyardResult<T> {
    serde_json::from_value(value).map_err(|e| {
        SwitchyardError::storage_with_key(format!("Corrupt stored value: {}", e), key)
    })
}

fn encode<T: Serialize>(key: &str, value: &T) -> SwitchyardResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        SwitchyardError::storage_with_key(format!("Failed to encode value: {}", e), key)
    })
}
