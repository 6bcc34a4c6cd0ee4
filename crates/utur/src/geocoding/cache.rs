use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::GeocodeResult;

/// Maximum age before a cached result is considered stale.
const MAX_AGE_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Backing slot for the serialized cache: a single string-keyed blob.
///
/// Both operations are infallible by contract: implementations swallow
/// their own errors. The blob is fully regenerable, so there is no
/// versioning and no migration.
pub trait Storage: Send + Sync {
    fn read(&self) -> Option<String>;
    fn write(&self, blob: &str);
}

impl<S: Storage> Storage for Arc<S> {
    fn read(&self) -> Option<String> {
        S::read(self)
    }

    fn write(&self, blob: &str) {
        S::write(self, blob);
    }
}

/// [`Storage`] backed by one file under the user cache directory.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Storage for FileStorage {
    fn read(&self) -> Option<String> {
        fs::read_to_string(&self.path).ok()
    }

    fn write(&self, blob: &str) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&self.path, blob) {
            tracing::debug!(path = %self.path.display(), error = %e, "cache write failed");
        }
    }
}

/// In-memory [`Storage`] for tests and embedders without a filesystem.
#[derive(Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw blob, if any has been written.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Option<String> {
        self.blob.lock().expect("poisoned").clone()
    }

    /// Seed the slot with a raw blob.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn replace(&self, blob: &str) {
        *self.blob.lock().expect("poisoned") = Some(blob.to_owned());
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> Option<String> {
        self.snapshot()
    }

    fn write(&self, blob: &str) {
        self.replace(blob);
    }
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct Entry {
    result: GeocodeResult,
    ts: i64,
}

/// Geocoding result cache with a 7-day TTL.
///
/// The whole mapping lives in one JSON blob (`{ key: { result, ts } }`).
/// Stale entries are dropped lazily whenever the blob is read, never
/// proactively. Storage failures degrade `get` to a miss and `put` to a
/// no-op; nothing here ever errors.
pub struct Cache<S> {
    storage: S,
}

impl<S: Storage> Cache<S> {
    #[must_use]
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Read the persisted mapping, keeping only entries fresh at `now`.
    fn fresh(&self, now: i64) -> HashMap<String, Entry> {
        let Some(raw) = self.storage.read() else {
            return HashMap::new();
        };
        let Ok(entries) = serde_json::from_str::<HashMap<String, Entry>>(&raw) else {
            return HashMap::new();
        };
        entries
            .into_iter()
            .filter(|(_, entry)| now - entry.ts < MAX_AGE_MS)
            .collect()
    }

    /// Look up a fresh cached result for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<GeocodeResult> {
        let now = chrono::Utc::now().timestamp_millis();
        self.fresh(now).remove(key).map(|entry| entry.result)
    }

    /// Insert or overwrite the entry for `key` and write the mapping back.
    pub fn put(&self, key: &str, result: &GeocodeResult) {
        let now = chrono::Utc::now().timestamp_millis();
        let mut entries = self.fresh(now);
        entries.insert(
            key.to_owned(),
            Entry {
                result: result.clone(),
                ts: now,
            },
        );
        if let Ok(blob) = serde_json::to_string(&entries) {
            self.storage.write(&blob);
        }
    }
}
