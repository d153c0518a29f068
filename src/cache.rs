use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::measure::Measurement;
use crate::url::ResolvedUrl;

/// Namespace prefix so badge entries never collide with unrelated data
/// sharing the same storage surface.
pub const CACHE_KEY_PREFIX: &str = "wcb_";

/// Entries older than 24 hours are treated as absent.
pub const MAX_ENTRY_AGE_MS: i64 = 86_400_000;

/// Synchronous key-value storage surface, the shape of browser localStorage.
/// Writes may fail (quota, IO); callers treat a failed write as "not cached".
pub trait Storage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removing an absent key is not an error.
    fn remove_item(&mut self, key: &str);
}

impl<T: Storage + ?Sized> Storage for Box<T> {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) {
        (**self).remove_item(key)
    }
}

/// A persisted measurement result plus its write timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub co2_per_view: f64,
    pub cleaner_than_percent: f64,
    pub cached_at_epoch_ms: i64,
}

/// Time-bounded measurement cache keyed by resolved URL. Entries are
/// overwritten wholesale, never mutated in place.
pub struct CacheStore<S> {
    storage: S,
}

impl<S: Storage> CacheStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Direct access to the underlying storage, mainly so embedders (and
    /// tests) can seed or inspect raw entries.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn key(url: &ResolvedUrl) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, url.as_str())
    }

    /// Fresh entry or nothing. Missing and unparseable entries are misses;
    /// a stale entry is evicted before reporting the miss, so a stale value
    /// is never observable as valid.
    pub fn get(&mut self, url: &ResolvedUrl) -> Option<CacheEntry> {
        let raw = self.storage.get_item(&Self::key(url))?;
        let entry: CacheEntry = serde_json::from_str(&raw).ok()?;
        if Utc::now().timestamp_millis() - entry.cached_at_epoch_ms > MAX_ENTRY_AGE_MS {
            self.remove(url);
            return None;
        }
        Some(entry)
    }

    /// Store a measurement, stamping the write time.
    pub fn put(&mut self, url: &ResolvedUrl, measurement: &Measurement) -> Result<()> {
        let entry = CacheEntry {
            co2_per_view: measurement.co2_per_view,
            cleaner_than_percent: measurement.cleaner_than_percent,
            cached_at_epoch_ms: Utc::now().timestamp_millis(),
        };
        let raw = serde_json::to_string(&entry).context("failed to serialize cache entry")?;
        self.storage.set_item(&Self::key(url), &raw)
    }

    pub fn remove(&mut self, url: &ResolvedUrl) {
        self.storage.remove_item(&Self::key(url));
    }
}

/// In-memory storage for tests and embedders that bring their own
/// persistence.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

/// Write-through storage backed by a single JSON file, the closest stand-in
/// for browser localStorage a terminal host has.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: HashMap<String, String>,
}

impl FileStorage {
    /// Open the store at `path`. An absent or unreadable file starts empty.
    pub fn open(path: PathBuf) -> Self {
        let items = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path, items }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("carbonbadge").join("cache.json"))
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache dir {}", parent.display()))?;
        }
        let raw = serde_json::to_string(&self.items).context("failed to serialize cache file")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write cache file {}", self.path.display()))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
        // Best effort: a failed write here only means the evicted entry
        // reappears next run, where it will be evicted again.
        let _ = self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BadgeConfig;
    use crate::url::resolve;

    fn url_for(location: &str) -> ResolvedUrl {
        resolve(&BadgeConfig::default(), location)
    }

    fn measurement(c: f64, p: f64) -> Measurement {
        Measurement {
            co2_per_view: c,
            cleaner_than_percent: p,
        }
    }

    fn seed_entry_aged(store: &mut CacheStore<MemoryStorage>, url: &ResolvedUrl, age_ms: i64) {
        let entry = CacheEntry {
            co2_per_view: 0.2,
            cleaner_than_percent: 70.0,
            cached_at_epoch_ms: Utc::now().timestamp_millis() - age_ms,
        };
        let raw = serde_json::to_string(&entry).unwrap();
        store
            .storage_mut()
            .set_item(&format!("{}{}", CACHE_KEY_PREFIX, url.as_str()), &raw)
            .unwrap();
    }

    #[test]
    fn test_round_trip_within_24h() {
        let mut store = CacheStore::new(MemoryStorage::new());
        let url = url_for("https://example.com/");
        store.put(&url, &measurement(0.17, 84.0)).unwrap();

        let entry = store.get(&url).expect("fresh entry should be present");
        assert_eq!(entry.co2_per_view, 0.17);
        assert_eq!(entry.cleaner_than_percent, 84.0);
        assert!(entry.cached_at_epoch_ms <= Utc::now().timestamp_millis());
    }

    #[test]
    fn test_get_missing_is_none() {
        let mut store = CacheStore::new(MemoryStorage::new());
        assert!(store.get(&url_for("https://example.com/")).is_none());
    }

    #[test]
    fn test_stale_entry_is_absent_and_evicted() {
        let mut store = CacheStore::new(MemoryStorage::new());
        let url = url_for("https://example.com/");
        seed_entry_aged(&mut store, &url, MAX_ENTRY_AGE_MS + 1);

        assert!(store.get(&url).is_none());
        // Eviction removed the raw entry, not just hid it.
        assert!(store.storage_mut().is_empty());
    }

    #[test]
    fn test_entry_just_inside_window_is_fresh() {
        let mut store = CacheStore::new(MemoryStorage::new());
        let url = url_for("https://example.com/");
        seed_entry_aged(&mut store, &url, MAX_ENTRY_AGE_MS - 1000);

        assert!(store.get(&url).is_some());
    }

    #[test]
    fn test_malformed_entry_is_a_miss() {
        let mut store = CacheStore::new(MemoryStorage::new());
        let url = url_for("https://example.com/");
        store
            .storage_mut()
            .set_item(&format!("{}{}", CACHE_KEY_PREFIX, url.as_str()), "{not json")
            .unwrap();

        assert!(store.get(&url).is_none());
    }

    #[test]
    fn test_put_overwrites_prior_entry() {
        let mut store = CacheStore::new(MemoryStorage::new());
        let url = url_for("https://example.com/");
        store.put(&url, &measurement(0.5, 10.0)).unwrap();
        store.put(&url, &measurement(0.17, 84.0)).unwrap();

        let entry = store.get(&url).unwrap();
        assert_eq!(entry.co2_per_view, 0.17);
        assert_eq!(store.storage_mut().len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = CacheStore::new(MemoryStorage::new());
        let url = url_for("https://example.com/");
        store.remove(&url);
        store.put(&url, &measurement(0.17, 84.0)).unwrap();
        store.remove(&url);
        store.remove(&url);
        assert!(store.get(&url).is_none());
    }

    #[test]
    fn test_keys_are_namespaced() {
        let mut store = CacheStore::new(MemoryStorage::new());
        let url = url_for("https://example.com/");
        store.put(&url, &measurement(0.17, 84.0)).unwrap();

        assert!(store.storage_mut().get_item(url.as_str()).is_none());
        assert!(store
            .storage_mut()
            .get_item(&format!("{}{}", CACHE_KEY_PREFIX, url.as_str()))
            .is_some());
    }

    #[test]
    fn test_file_storage_round_trip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let url = url_for("https://example.com/");

        {
            let mut store = CacheStore::new(FileStorage::open(path.clone()));
            store.put(&url, &measurement(0.17, 84.0)).unwrap();
        }

        let mut reopened = CacheStore::new(FileStorage::open(path));
        let entry = reopened.get(&url).expect("entry should survive reopen");
        assert_eq!(entry.cleaner_than_percent, 84.0);
    }

    #[test]
    fn test_file_storage_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "definitely not json").unwrap();

        let storage = FileStorage::open(path);
        assert!(storage.get_item("wcb_anything").is_none());
    }

    #[test]
    fn test_file_storage_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let url = url_for("https://example.com/");

        {
            let mut store = CacheStore::new(FileStorage::open(path.clone()));
            store.put(&url, &measurement(0.17, 84.0)).unwrap();
            store.remove(&url);
        }

        let mut reopened = CacheStore::new(FileStorage::open(path));
        assert!(reopened.get(&url).is_none());
    }
}
