//! JSON file store
//!
//! Each key lives in its own `<key>.json` file under the data directory.
//! Writes go to a uniquely named temp file which is then renamed over the
//! target, so readers never observe a partially written document.
//!
//! Every mutation holds an exclusive OS advisory lock on `<dir>/.lock` for
//! its whole read, apply and rename cycle. Stores opened on the same
//! directory, in this process or another one, therefore never interleave
//! their updates. Advisory locks are only honoured by cooperating writers
//! and may be unreliable on network filesystems.

use super::{KvStore, UpdateFn};
use crate::error::{SwitchyardError, SwitchyardResult};
use async_trait::async_trait;
use serde_json::Value;
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Lock file guarding mutations; keys may not start with '.', so it never
/// collides with a stored document
const LOCK_FILE: &str = ".lock";

/// Durable store backed by one JSON file per key
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    /// Queues this instance's writers so at most one waits on the file lock
    write_lock: Mutex<()>,
}

/// Held for the duration of one mutation
///
/// Closing the file releases the advisory lock.
struct WriteGuard<'a> {
    _local: MutexGuard<'a, ()>,
    _file: File,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> SwitchyardResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            SwitchyardError::io_with_path(
                format!("Failed to create data directory: {}", e),
                dir.display().to_string(),
            )
        })?;
        debug!(dir = %dir.display(), "Opened JSON file store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the store's files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serialize against every other writer on this directory
    async fn lock(&self) -> SwitchyardResult<WriteGuard<'_>> {
        let local = self.write_lock.lock().await;
        let path = self.dir.join(LOCK_FILE);

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(|e| SwitchyardError::storage(format!("Lock task failed: {}", e)))?
        .map_err(|e| {
            SwitchyardError::io_with_path(
                format!("Failed to lock data directory: {}", e),
                self.dir.display().to_string(),
            )
        })?;

        Ok(WriteGuard {
            _local: local,
            _file: file,
        })
    }

    fn path_for(&self, key: &str) -> SwitchyardResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(SwitchyardError::storage_with_key(
                "Keys may only contain ASCII letters, digits, '_', '-' and '.'",
                key,
            ));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    async fn read_path(&self, key: &str, path: &Path) -> SwitchyardResult<Option<Value>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content).map_err(|e| {
                    SwitchyardError::storage_with_key(format!("Corrupt store file: {}", e), key)
                })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SwitchyardError::storage_with_key(
                format!("Failed to read {}: {}", path.display(), e),
                key,
            )),
        }
    }

    async fn write_path(&self, key: &str, path: &Path, value: &Value) -> SwitchyardResult<()> {
        let content = serde_json::to_vec(value)?;
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&tmp, &content).await {
            return Err(SwitchyardError::storage_with_key(
                format!("Failed to write {}: {}", tmp.display(), e),
                key,
            ));
        }
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(SwitchyardError::storage_with_key(
                format!("Failed to replace {}: {}", path.display(), e),
                key,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn read(&self, key: &str) -> SwitchyardResult<Option<Value>> {
        let path = self.path_for(key)?;
        self.read_path(key, &path).await
    }

    async fn write(&self, key: &str, value: Value) -> SwitchyardResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.lock().await?;
        self.write_path(key, &path, &value).await
    }

    async fn remove(&self, key: &str) -> SwitchyardResult<bool> {
        let path = self.path_for(key)?;
        let _guard = self.lock().await?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SwitchyardError::storage_with_key(
                format!("Failed to remove {}: {}", path.display(), e),
                key,
            )),
        }
    }

    async fn update(&self, key: &str, apply: &mut UpdateFn<'_>) -> SwitchyardResult<Value> {
        let path = self.path_for(key)?;
        let _guard = self.lock().await?;
        let current = self.read_path(key, &path).await?;
        let next = apply(current)?;
        self.write_path(key, &path, &next).await?;
        Ok(next)
    }
}
