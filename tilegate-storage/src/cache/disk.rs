//! Flat, content-addressed tile directory.
//!
//! One file per cache key, named by the key, holding the final image bytes.
//! Writes land in a uniquely named temp file first and are published with a
//! hard link, so readers never see a partial tile and the first published
//! link for a key is the one that stays.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tilegate_core::{CacheError, CacheKey};
use tracing::{debug, warn};
use uuid::Uuid;

use super::traits::{StoreCounters, StoreOutcome, StoreStats, TileStore};

/// Suffix of in-flight writes. Never a valid key, so lookups cannot hit one.
const TEMP_SUFFIX: &str = ".tmp";

/// Disk-backed [`TileStore`].
#[derive(Debug)]
pub struct DiskTileStore {
    root: PathBuf,
    counters: StoreCounters,
}

impl DiskTileStore {
    /// Create a store over `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counters: StoreCounters::default(),
        }
    }

    /// Create a store over `root`, creating the directory if it is missing.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let store = Self::new(root);
        tokio::fs::create_dir_all(&store.root)
            .await
            .map_err(|e| store.root_error(e.to_string()))?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn temp_path_for(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(format!(".{}.{}{}", key, Uuid::now_v7().simple(), TEMP_SUFFIX))
    }

    fn root_error(&self, reason: String) -> CacheError {
        CacheError::Root {
            path: self.root.display().to_string(),
            reason,
        }
    }
}

/// Write `bytes` to `temp` and publish it at `dest` if nothing is there yet.
fn publish(temp: &Path, dest: &Path, bytes: &[u8]) -> std::io::Result<StoreOutcome> {
    let written = write_new(temp, bytes).and_then(|()| match fs::hard_link(temp, dest) {
        Ok(()) => Ok(StoreOutcome::Written),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(StoreOutcome::AlreadyPresent),
        // Filesystems without hard links: create the entry exclusively instead.
        Err(e) if e.kind() == ErrorKind::Unsupported => match write_new(dest, bytes) {
            Ok(()) => Ok(StoreOutcome::Written),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(StoreOutcome::AlreadyPresent),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    });

    if let Err(e) = fs::remove_file(temp) {
        if e.kind() != ErrorKind::NotFound {
            debug!(path = %temp.display(), error = %e, "Failed to remove temp tile");
        }
    }

    written
}

fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file: File = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.flush()
}

#[async_trait]
impl TileStore for DiskTileStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let result = match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        };
        self.counters.record_lookup(&result);
        result
    }

    async fn store(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<StoreOutcome, CacheError> {
        let dest = self.path_for(key);

        let result = if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            Ok(StoreOutcome::AlreadyPresent)
        } else {
            let temp = self.temp_path_for(key);
            let write_error = |reason: String| CacheError::Write {
                key: key.to_string(),
                reason,
            };
            tokio::task::spawn_blocking(move || publish(&temp, &dest, &bytes))
                .await
                .map_err(|e| write_error(e.to_string()))
                .and_then(|r| r.map_err(|e| write_error(e.to_string())))
        };

        if let Err(e) = &result {
            warn!(key = %key, error = %e, "Tile store failed");
        }
        self.counters.record_store(&result);
        result
    }

    async fn check(&self) -> Result<(), CacheError> {
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| self.root_error(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(self.root_error("not a directory".to_string()));
        }
        if metadata.permissions().readonly() {
            return Err(self.root_error("read-only".to_string()));
        }
        Ok(())
    }

    fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }
}
