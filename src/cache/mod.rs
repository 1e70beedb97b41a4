//! Local cache layer: a forgiving envelope around a fallible key-value
//! surface. `save` and `load` never propagate an error: a broken local
//! store degrades to the caller-provided fallback, it does not take the
//! application down.

mod envelope;
mod file;
pub mod keys;
mod memory;

pub use envelope::{decode_record, legacy_array_to_envelope, CacheRecord, DecodeError, Envelope};
pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum KeyValueError {
    #[error("key-value storage error: {0}")]
    Storage(String),
}

/// The local persistence surface this crate needs: synchronous string
/// get/set/remove, each independently fallible.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError>;
    fn set(&self, key: &str, value: &str) -> Result<(), KeyValueError>;
    fn remove(&self, key: &str) -> Result<(), KeyValueError>;
}

#[derive(Clone)]
pub struct KeyValueCache {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Mirror a collection under `key` in the envelope format. If the
    /// envelope cannot be written, retry with the bare array; if that
    /// also fails, log and swallow; callers never see an error here.
    pub fn save<T: Serialize>(&self, key: &str, data: &[T]) {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct BorrowedEnvelope<'a, T> {
            data: &'a [T],
            #[serde(with = "time::serde::rfc3339")]
            timestamp: time::OffsetDateTime,
            count: usize,
        }

        let envelope = BorrowedEnvelope {
            data,
            timestamp: time::OffsetDateTime::now_utc(),
            count: data.len(),
        };
        match serde_json::to_string(&envelope) {
            Ok(raw) => match self.store.set(key, &raw) {
                Ok(()) => return,
                Err(e) => {
                    warn!(key, error = %e, "Envelope write failed, retrying with bare array");
                }
            },
            Err(e) => {
                warn!(key, error = %e, "Envelope serialization failed, retrying with bare array");
            }
        }

        match serde_json::to_string(data) {
            Ok(raw) => {
                if let Err(e) = self.store.set(key, &raw) {
                    warn!(key, error = %e, "Bare-array write failed, cache entry is stale");
                }
            }
            Err(e) => {
                warn!(key, error = %e, "Bare-array serialization failed, cache entry is stale");
            }
        }
    }

    /// Read the collection at `key`, accepting both the envelope and the
    /// legacy bare-array format. A missing key, a read error, or a
    /// corrupt record all degrade to `fallback`.
    pub fn load<T: DeserializeOwned>(&self, key: &str, fallback: Vec<T>) -> Vec<T> {
        self.load_tracked(key, fallback).0
    }

    /// `load`, plus whether the value actually came from the store. The
    /// reconciliation engine uses the flag for collection provenance.
    pub fn load_tracked<T: DeserializeOwned>(&self, key: &str, fallback: Vec<T>) -> (Vec<T>, bool) {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (fallback, false),
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, using fallback");
                return (fallback, false);
            }
        };

        match decode_record::<T>(&raw) {
            Ok(envelope) => (envelope.data, true),
            Err(e) => {
                warn!(key, error = %e, "Corrupt cache record, using fallback");
                (fallback, false)
            }
        }
    }

    /// Drop the record at `key`. Best effort, like `save`.
    pub fn evict(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "Cache eviction failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_over(store: &Arc<MemoryKeyValueStore>) -> KeyValueCache {
        KeyValueCache::new(Arc::clone(store) as Arc<dyn KeyValueStore>)
    }

    #[test]
    fn save_wraps_in_envelope() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = cache_over(&store);

        cache.save("k", &[10i32, 20]);
        let raw = store.raw("k").unwrap();
        assert!(raw.contains("\"data\":[10,20]"));
        assert!(raw.contains("\"count\":2"));
        assert!(raw.contains("\"timestamp\""));
    }

    #[test]
    fn load_accepts_both_formats_and_falls_back() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = cache_over(&store);

        store.set_raw("legacy", "[1,2,3]");
        assert_eq!(cache.load("legacy", vec![0i32]), vec![1, 2, 3]);

        store.set_raw(
            "envelope",
            r#"{"data":[7],"timestamp":"2026-01-15T10:00:00Z","count":1}"#,
        );
        assert_eq!(cache.load("envelope", vec![0i32]), vec![7]);

        assert_eq!(cache.load("missing", vec![9i32]), vec![9]);

        store.set_raw("corrupt", "{not json");
        assert_eq!(cache.load("corrupt", vec![5i32]), vec![5]);
    }

    #[test]
    fn load_tracked_reports_provenance() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = cache_over(&store);

        let (_, hit) = cache.load_tracked::<i32>("missing", vec![]);
        assert!(!hit);

        store.set_raw("present", "[1]");
        let (_, hit) = cache.load_tracked::<i32>("present", vec![]);
        assert!(hit);
    }
}
