//! Durable cache snapshots.
//!
//! [`CachePersistence`] turns a store's entry map into a versioned JSON
//! blob and back, using any [`BlobStore`] for the bytes. Loading never
//! fails: a missing blob, an unreadable store or a corrupt snapshot all
//! yield an empty map (the corrupt blob is removed so the next start is
//! clean). Expired entries are pruned on load.
//!
//! # Snapshot format
//!
//! ```json
//! { "version": 1, "savedAt": 1700000000000, "entries": [["ak-74m", { "data": [...], ... }]] }
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{CacheEntry, CacheStore, CacheValue};
use crate::telemetry;
use crate::{FleamarkError, Result};

/// Highest snapshot format version this build understands.
const SNAPSHOT_VERSION: u32 = 1;

/// Suffix counter for temporary files; every write gets its own.
static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Key → string blob storage.
///
/// The adapter owns the serialization format; implementations only move
/// strings around.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store name for logging/debugging.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject blobs larger than `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        check_quota(self.quota, value)?;
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

/// One JSON file per key inside a directory.
///
/// Writes go to a uniquely named temporary file that is then renamed over
/// the target, so a crash mid-write leaves the previous snapshot intact and
/// concurrent writers never share a temporary file.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileBlobStore {
    /// Use `dir` for blobs. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota: None,
        }
    }

    /// Reject blobs larger than `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Default location: `<cache dir>/fleamark`.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("fleamark")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9_-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FleamarkError::Persistence(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        check_quota(self.quota, value)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            FleamarkError::Persistence(format!(
                "failed to create cache dir {}: {e}",
                self.dir.display()
            ))
        })?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));
        let written = match tokio::fs::write(&tmp_path, value).await {
            Ok(()) => tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
                FleamarkError::Persistence(format!(
                    "failed to rename {} → {}: {e}",
                    tmp_path.display(),
                    path.display()
                ))
            }),
            Err(e) => Err(FleamarkError::Persistence(format!(
                "failed to write {}: {e}",
                tmp_path.display()
            ))),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp_path).await;
        }
        written
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FleamarkError::Persistence(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

fn check_quota(quota: Option<usize>, value: &str) -> Result<()> {
    match quota {
        Some(limit) if value.len() > limit => Err(FleamarkError::QuotaExceeded {
            needed: value.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

// ============================================================================
// Snapshot adapter
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOut<'a, V> {
    version: u32,
    saved_at: u64,
    entries: Vec<(&'a String, &'a CacheEntry<V>)>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotIn<V> {
    version: u32,
    entries: Vec<(String, CacheEntry<V>)>,
}

/// Entries restored from a snapshot.
#[derive(Debug)]
pub struct LoadedSnapshot<V> {
    /// Entries still valid at load time.
    pub entries: HashMap<String, CacheEntry<V>>,
    /// Expired entries dropped while loading.
    pub pruned: usize,
}

impl<V> Default for LoadedSnapshot<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            pruned: 0,
        }
    }
}

/// Saves and restores one cache store under one blob key.
///
/// Writes through [`persist`](Self::persist) are serialized per instance,
/// and each one snapshots the store only once it holds the write lock, so
/// the last completed write always reflects the latest entries.
#[derive(Clone)]
pub struct CachePersistence {
    store: Arc<dyn BlobStore>,
    key: String,
    cache: &'static str,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl CachePersistence {
    /// `cache` labels metrics and log lines (e.g. "text").
    pub fn new(store: Arc<dyn BlobStore>, key: impl Into<String>, cache: &'static str) -> Self {
        Self {
            store,
            key: key.into(),
            cache,
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Restore the persisted entries that are still valid at `now`.
    ///
    /// Never fails; problems are logged and produce an empty snapshot.
    pub async fn load<V: CacheValue>(&self, now: u64) -> LoadedSnapshot<V> {
        let blob = match self.store.get(&self.key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return LoadedSnapshot::default(),
            Err(e) => {
                self.record_failure("load");
                warn!(cache = self.cache, store = self.store.name(), error = %e, "failed to read cache snapshot");
                return LoadedSnapshot::default();
            }
        };

        let entries = match parse_snapshot::<V>(&blob) {
            Ok(entries) => entries,
            Err(e) => {
                self.record_failure("load");
                warn!(cache = self.cache, key = %self.key, error = %e, "corrupt cache snapshot, starting cold");
                if let Err(e) = self.store.remove(&self.key).await {
                    debug!(cache = self.cache, error = %e, "failed to remove corrupt snapshot");
                }
                return LoadedSnapshot::default();
            }
        };

        let total = entries.len();
        let valid: HashMap<String, CacheEntry<V>> = entries
            .into_iter()
            .filter(|(_, entry)| entry.is_valid_at(now))
            .collect();
        let pruned = total - valid.len();
        debug!(
            cache = self.cache,
            loaded = valid.len(),
            pruned,
            "restored cache snapshot"
        );
        LoadedSnapshot {
            entries: valid,
            pruned,
        }
    }

    /// Snapshot `store` and write it, ordered after any write in flight.
    pub async fn persist<V: CacheValue>(&self, store: &CacheStore<V>, now: u64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let entries = store.snapshot();
        self.save(&entries, now).await
    }

    /// Persist the full entry map.
    ///
    /// Unordered with respect to other writers; prefer [`persist`](Self::persist).
    pub async fn save<V: CacheValue>(
        &self,
        entries: &HashMap<String, CacheEntry<V>>,
        now: u64,
    ) -> Result<()> {
        let snapshot = SnapshotOut {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            entries: entries.iter().collect(),
        };
        let blob = serde_json::to_string(&snapshot).inspect_err(|_| {
            self.record_failure("save");
        })?;
        self.store.set(&self.key, &blob).await.inspect_err(|_| {
            self.record_failure("save");
        })
    }

    fn record_failure(&self, operation: &'static str) {
        metrics::counter!(telemetry::PERSISTENCE_FAILURES_TOTAL,
            "cache" => self.cache,
            "operation" => operation,
        )
        .increment(1);
    }
}

fn parse_snapshot<V: CacheValue>(blob: &str) -> Result<Vec<(String, CacheEntry<V>)>> {
    let snapshot: SnapshotIn<V> = serde_json::from_str(blob)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(FleamarkError::Persistence(format!(
            "unsupported snapshot version {} (max supported: {SNAPSHOT_VERSION})",
            snapshot.version
        )));
    }
    Ok(snapshot.entries)
}
