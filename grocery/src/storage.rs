//! File-backed key-value storage.
//!
//! Each key maps to `<dir>/<key>.json`. Writes go to a temporary file first and are
//! renamed into place, so a crash mid-write leaves the previous record intact.

use basket_core::kv_store::{KeyValueStore, KvFuture, KvStoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each key as a JSON file under a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced so a key can never escape the
    /// directory.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn map_io(error: &std::io::Error, needed: usize) -> KvStoreError {
    match error.kind() {
        ErrorKind::StorageFull => KvStoreError::QuotaExceeded {
            needed,
            available: 0,
        },
        ErrorKind::WouldBlock | ErrorKind::Interrupted | ErrorKind::TimedOut => {
            KvStoreError::Unavailable(error.to_string())
        },
        _ => KvStoreError::Io(error.to_string()),
    }
}

impl KeyValueStore for JsonFileStore {
    fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>> {
        Box::pin(async move {
            let path = self.path_for(key);
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %error, "read failed");
                    Err(map_io(&error, 0))
                },
            }
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> KvFuture<'a, ()> {
        Box::pin(async move {
            let path = self.path_for(key);
            let tmp = path.with_extension("json.tmp");
            let needed = value.len();

            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| map_io(&e, needed))?;
            tokio::fs::write(&tmp, value)
                .await
                .map_err(|e| map_io(&e, needed))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| map_io(&e, needed))?;

            tracing::trace!(path = %path.display(), bytes = needed, "record written");
            Ok(())
        })
    }
}
