use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use exn::ResultExt;

const RECORDS_FILE: &str = "trip.json";

/// Errors returned by [`Trip`] operations.
#[derive(Debug)]
pub struct Error(String);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

fn records_path(dir: &Path) -> PathBuf {
    dir.join(RECORDS_FILE)
}

/// Load the record map from `dir`, or start empty when no file exists yet.
fn load_records(dir: &Path) -> exn::Result<BTreeMap<String, serde_json::Value>, Error> {
    let path = records_path(dir);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read_to_string(&path).or_raise(|| Error(format!("read {}", path.display())))?;
    serde_json::from_str(&raw).or_raise(|| Error(format!("parse {}", path.display())))
}

/// Serialize the full record map and write it back, when persistence is on.
fn persist(inner: &Inner) -> exn::Result<(), Error> {
    let Some(dir) = &inner.data_dir else {
        return Ok(());
    };
    let path = records_path(dir);
    let blob = serde_json::to_string_pretty(&inner.records)
        .or_raise(|| Error("serialize records".into()))?;
    fs::write(&path, blob).or_raise(|| Error(format!("write {}", path.display())))?;
    Ok(())
}

struct Inner {
    records: BTreeMap<String, serde_json::Value>,
    data_dir: Option<PathBuf>,
}

/// String-keyed record store with optional persistence.
///
/// Obtained via [`Trip::open`] (persistent) or [`Trip::ephemeral`]
/// (in-memory). Cloneable; all clones share the same record map. Records
/// are serde values keyed by `<kind>.<id>`; the whole map is serialized as
/// one JSON document, last write wins.
#[derive(Clone)]
pub struct Trip {
    inner: Arc<Mutex<Inner>>,
}

impl Trip {
    /// Open a persistent store backed by a file in `data_dir`.
    pub fn open(data_dir: &Path) -> exn::Result<Self, Error> {
        fs::create_dir_all(data_dir)
            .or_raise(|| Error(format!("create data dir {}", data_dir.display())))?;
        let records = load_records(data_dir)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                records,
                data_dir: Some(data_dir.to_owned()),
            })),
        })
    }

    /// Create an ephemeral (in-memory, no persistence) store.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                records: BTreeMap::new(),
                data_dir: None,
            })),
        }
    }

    /// Read a record, deserializing from its stored JSON value.
    ///
    /// Returns `None` if the key is absent or deserialization fails.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.inner.lock().expect("poisoned");
        inner
            .records
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Insert or overwrite a record.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set<T: serde::Serialize>(&self, key: &str, value: &T) -> exn::Result<(), Error> {
        let value = serde_json::to_value(value)
            .or_raise(|| Error(format!("serialize record for key {key}")))?;
        let mut inner = self.inner.lock().expect("poisoned");
        inner.records.insert(key.to_owned(), value);
        persist(&inner)?;
        drop(inner);
        tracing::debug!(key, "record set");
        Ok(())
    }

    /// Delete a record. Deleting an absent key is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn delete(&self, key: &str) -> exn::Result<(), Error> {
        let mut inner = self.inner.lock().expect("poisoned");
        inner.records.remove(key);
        persist(&inner)?;
        drop(inner);
        tracing::debug!(key, "record deleted");
        Ok(())
    }

    /// List all records whose key starts with `prefix`, deserializing each
    /// value. Records that fail to deserialize are silently skipped.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn list_by_prefix<T: serde::de::DeserializeOwned>(&self, prefix: &str) -> Vec<(String, T)> {
        let inner = self.inner.lock().expect("poisoned");
        inner
            .records
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter_map(|(key, value)| {
                serde_json::from_value(value.clone())
                    .ok()
                    .map(|v| (key.clone(), v))
            })
            .collect()
    }
}
