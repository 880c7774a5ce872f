//! Bounded, recency-ordered cache with optional whole-file persistence
//!
//! Entries are stamped with a monotonically increasing tick on every touch;
//! the ordered stamp index gives O(log n) promotion and LRU eviction.

use crate::error::{TijoError, TijoResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::hash::Hash;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Snapshot schema version written by [`BoundedCache::save`]
pub const SNAPSHOT_VERSION: u32 = 1;

/// Suffix of the scratch file written before the snapshot is renamed into place
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    stamp: u64,
}

/// On-disk layout, entries listed least recently used first
#[derive(Serialize)]
struct SnapshotRef<'a, K, V> {
    version: u32,
    entries: Vec<(&'a K, &'a V)>,
}

#[derive(Deserialize)]
struct Snapshot<K, V> {
    version: u32,
    entries: Vec<(K, V)>,
}

/// Capacity-limited LRU map
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: HashMap<K, Slot<V>>,
    order: BTreeMap<u64, K>,
    tick: u64,
    path: Option<PathBuf>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty in-memory cache.
    ///
    /// A `capacity` of `0` means *unbounded*: eviction is disabled entirely.
    /// It does not mean "caching disabled".
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
            path: None,
        }
    }

    /// Maximum number of entries kept after an insertion (0 = unbounded)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity.
    ///
    /// Excess entries are not evicted here; the next insertion of a new key
    /// trims the cache down to the new capacity.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Backing file, if this cache is persistent
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check for a key without touching its recency
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Look up a key, promoting it to most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key).map(|value| &*value)
    }

    /// Mutable lookup, promoting the key to most recently used
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let stamp = self.entries.get(key)?.stamp;
        let stamp = self.promote(stamp);
        let slot = self.entries.get_mut(key)?;
        slot.stamp = stamp;
        Some(&mut slot.value)
    }

    /// Insert or replace a value, returning whatever was evicted to make room.
    ///
    /// Replacing an existing key only promotes it. Inserting a new key into a
    /// bounded cache first evicts least recently used entries until there is
    /// room for one more.
    pub fn set(&mut self, key: K, value: V) -> Vec<(K, V)> {
        if let Some(stamp) = self.entries.get(&key).map(|slot| slot.stamp) {
            let stamp = self.promote(stamp);
            if let Some(slot) = self.entries.get_mut(&key) {
                slot.value = value;
                slot.stamp = stamp;
            }
            return Vec::new();
        }

        let mut evicted = Vec::new();
        if self.capacity > 0 {
            while self.entries.len() >= self.capacity {
                match self.pop_lru() {
                    Some(entry) => evicted.push(entry),
                    None => break,
                }
            }
        }

        self.push_back(key, value);
        evicted
    }

    /// Remove a key without affecting the order of the others
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.stamp);
        Some(slot.value)
    }

    /// Drop the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key).map(|slot| (key, slot.value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Iterate from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order
            .values()
            .filter_map(|key| self.entries.get(key).map(|slot| (key, &slot.value)))
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.values()
    }

    fn next_stamp(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn promote(&mut self, stamp: u64) -> u64 {
        let next = self.next_stamp();
        if let Some(key) = self.order.remove(&stamp) {
            self.order.insert(next, key);
        }
        next
    }

    /// Append as most recently used without any capacity check
    fn push_back(&mut self, key: K, value: V) {
        if let Some(old) = self.entries.remove(&key) {
            self.order.remove(&old.stamp);
        }
        let stamp = self.next_stamp();
        self.order.insert(stamp, key.clone());
        self.entries.insert(key, Slot { value, stamp });
    }
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Clone + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// Create a cache bound to `path`, loading the previous snapshot if any.
    ///
    /// A missing, unreadable or corrupt snapshot yields an empty cache; the
    /// entries are rebuilt as they are fetched again. The loaded entries are
    /// not trimmed to `capacity` until the next insertion.
    pub fn open(capacity: usize, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut cache = Self::new(capacity);

        match read_snapshot::<K, V>(&path) {
            Ok(Some(entries)) => {
                debug!(path = %path.display(), entries = entries.len(), "loaded cache snapshot");
                for (key, value) in entries {
                    cache.push_back(key, value);
                }
            }
            Ok(None) => debug!(path = %path.display(), "no cache snapshot, starting empty"),
            Err(e) => warn!(path = %path.display(), error = %e, "discarding unreadable cache snapshot"),
        }

        cache.path = Some(path);
        cache
    }

    /// Write the whole map to the backing file, replacing any previous snapshot.
    ///
    /// No-op for in-memory caches. The snapshot is written next to the target
    /// and renamed over it so readers never observe a half-written file.
    pub fn save(&self) -> TijoResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            entries: self.iter().collect(),
        };
        let bytes = serde_json::to_vec(&snapshot)?;

        let mut temp = path.as_os_str().to_owned();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        fs::write(&temp, &bytes)?;
        fs::rename(&temp, path)?;

        debug!(path = %path.display(), entries = self.len(), "saved cache snapshot");
        Ok(())
    }
}

fn read_snapshot<K, V>(path: &Path) -> TijoResult<Option<Vec<(K, V)>>>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let snapshot: Snapshot<K, V> = serde_json::from_slice(&bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(TijoError::CacheError(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }

    Ok(Some(snapshot.entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn keys(cache: &BoundedCache<String, String>) -> Vec<&str> {
        cache.keys().map(String::as_str).collect()
    }

    fn set(cache: &mut BoundedCache<String, String>, key: &str, value: &str) {
        cache.set(key.to_string(), value.to_string());
    }

    #[test]
    fn test_eviction_scenario() {
        let mut cache = BoundedCache::new(2);
        assert_eq!(cache.capacity(), 2);
        assert!(cache.is_empty());

        set(&mut cache, "key1", "value1");
        set(&mut cache, "key2", "value2");
        set(&mut cache, "key3", "value3");
        assert!(!cache.contains_key("key1"));
        assert!(cache.contains_key("key2"));
        assert!(cache.contains_key("key3"));
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.get("key3").map(String::as_str), Some("value3"));
        set(&mut cache, "key4", "value4");
        assert!(!cache.contains_key("key2"));
        assert!(cache.contains_key("key3"));
        assert!(cache.contains_key("key4"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_updates_recency() {
        let mut cache = BoundedCache::new(2);
        set(&mut cache, "A", "a");
        set(&mut cache, "B", "b");
        set(&mut cache, "C", "c");
        assert_eq!(keys(&cache), vec!["B", "C"]);

        cache.get("B");
        set(&mut cache, "D", "d");
        assert_eq!(keys(&cache), vec!["B", "D"]);
    }

    #[test]
    fn test_set_existing_key_replaces_and_promotes() {
        let mut cache = BoundedCache::new(2);
        set(&mut cache, "key1", "value1");
        set(&mut cache, "key2", "value2");

        let evicted = cache.set("key1".into(), "updated".into());
        assert!(evicted.is_empty());
        assert_eq!(cache.len(), 2);
        assert_eq!(keys(&cache), vec!["key2", "key1"]);

        set(&mut cache, "key3", "value3");
        assert_eq!(keys(&cache), vec!["key1", "key3"]);
        assert_eq!(cache.get("key1").map(String::as_str), Some("updated"));
    }

    #[test]
    fn test_set_reports_evicted_entries() {
        let mut cache = BoundedCache::new(1);
        set(&mut cache, "old", "1");
        let evicted = cache.set("new".into(), "2".into());
        assert_eq!(evicted, vec![("old".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_capacity_invariant_holds_after_every_set() {
        let mut cache = BoundedCache::new(3);
        for i in 0..50u32 {
            cache.set(i % 7, i);
            if i % 3 == 0 {
                cache.get(&(i % 5));
            }
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let mut cache = BoundedCache::new(0);
        for i in 0..500u32 {
            cache.set(i, i * 2);
        }
        assert_eq!(cache.len(), 500);
        assert_eq!(cache.get(&0), Some(&0));
    }

    #[test]
    fn test_capacity_shrink_is_lazy() {
        let mut cache = BoundedCache::new(3);
        set(&mut cache, "key1", "value1");
        set(&mut cache, "key2", "value2");
        set(&mut cache, "key3", "value3");
        assert_eq!(cache.len(), 3);

        cache.set_capacity(2);
        assert_eq!(cache.len(), 3);

        let evicted = cache.set("key4".into(), "value4".into());
        assert_eq!(evicted.len(), 2);
        assert_eq!(keys(&cache), vec!["key3", "key4"]);
    }

    #[test]
    fn test_remove_and_pop() {
        let mut cache = BoundedCache::new(3);
        set(&mut cache, "a", "1");
        set(&mut cache, "b", "2");
        set(&mut cache, "c", "3");

        assert_eq!(cache.remove("b"), Some("2".to_string()));
        assert_eq!(cache.remove("b"), None);
        assert_eq!(cache.pop_lru(), Some(("a".to_string(), "1".to_string())));
        assert_eq!(keys(&cache), vec!["c"]);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.pop_lru(), None);
    }

    #[test]
    fn test_save_and_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("capacity_2");

        let mut cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert!(cache.is_empty());
        set(&mut cache, "key1", "value1");
        cache.save().unwrap();

        let mut cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("key1").map(String::as_str), Some("value1"));

        set(&mut cache, "key2", "value2");
        cache.save().unwrap();

        let mut cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert_eq!(cache.len(), 2);
        cache.get("key1");
        set(&mut cache, "key3", "value3");
        cache.save().unwrap();

        let mut cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert_eq!(keys(&cache), vec!["key1", "key3"]);

        // unsaved changes are lost on reopen
        set(&mut cache, "key4", "value4");
        assert_eq!(keys(&cache), vec!["key3", "key4"]);
        let cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert_eq!(keys(&cache), vec!["key1", "key3"]);
    }

    #[test]
    fn test_snapshot_preserves_recency_order() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("order");

        let mut cache: BoundedCache<String, String> = BoundedCache::open(3, &path);
        set(&mut cache, "a", "1");
        set(&mut cache, "b", "2");
        set(&mut cache, "c", "3");
        cache.get("a");
        cache.save().unwrap();

        let mut cache: BoundedCache<String, String> = BoundedCache::open(3, &path);
        set(&mut cache, "d", "4");
        assert_eq!(keys(&cache), vec!["c", "a", "d"]);
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("deeper").join("ls");

        let mut cache: BoundedCache<String, String> = BoundedCache::open(10, &path);
        set(&mut cache, "k", "v");
        cache.save().unwrap();

        assert!(path.exists());
        assert!(!temp.path().join("nested").join("deeper").join("ls.tmp").exists());
    }

    #[test]
    fn test_save_without_path_is_noop() {
        let mut cache = BoundedCache::new(2);
        set(&mut cache, "k", "v");
        assert!(cache.path().is_none());
        cache.save().unwrap();
    }

    #[test]
    fn test_corrupt_snapshot_loads_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("corrupt");
        fs::write(&path, b"\x80\x04not json at all").unwrap();

        let mut cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert!(cache.is_empty());

        set(&mut cache, "k", "v");
        cache.save().unwrap();
        let cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_snapshot_version_loads_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("future");
        fs::write(&path, r#"{"version": 99, "entries": [["k", "v"]]}"#).unwrap();

        let cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oversized_snapshot_trimmed_on_next_insert() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("big");

        let mut cache: BoundedCache<String, String> = BoundedCache::open(0, &path);
        for i in 0..5 {
            cache.set(format!("k{i}"), format!("v{i}"));
        }
        cache.save().unwrap();

        let mut cache: BoundedCache<String, String> = BoundedCache::open(2, &path);
        assert_eq!(cache.len(), 5);
        set(&mut cache, "k5", "v5");
        assert_eq!(keys(&cache), vec!["k4", "k5"]);
    }
}
