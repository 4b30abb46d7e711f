//! Cache bookkeeping entities persisted in `metadata.json`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::quality::TransformOptions;

/// Schema version written into every index.
pub const INDEX_VERSION: u32 = 1;

/// Identifier under which a derivative's metadata and file are indexed.
///
/// The key is also the derivative's file name inside the cache root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an existing key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives a key from the full origin URI and, for derivatives, the transform.
    ///
    /// Two renditions of the same image never share a key.
    #[must_use]
    pub fn derive(uri: &str, transform: Option<&TransformOptions>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(uri.as_bytes());
        if let Some(options) = transform {
            hasher.update(b"|");
            hasher.update(options.descriptor().as_bytes());
        }
        let digest = hasher.finalize();
        let ext = transform.map_or_else(|| extension_from_uri(uri), |o| o.format.extension());
        Self(format!("{}.{ext}", hex::encode(&digest[..16])))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

fn extension_from_uri(uri: &str) -> &'static str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "jpg",
        Some("png") => "png",
        Some("webp") => "webp",
        Some("gif") => "gif",
        _ => "img",
    }
}

/// One locally stored derivative of a remote resource.
///
/// Its key is the index map key and its local path is `cache_root/key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Updated on every cache hit.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_accessed: DateTime<Utc>,
    /// Reported size at write time.
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Remote URI this entry derives from.
    #[serde(rename = "source")]
    pub origin_uri: String,
}

impl CacheEntry {
    /// Creates an entry accessed at `now`.
    #[must_use]
    pub fn new(origin_uri: impl Into<String>, size_bytes: u64, now: DateTime<Utc>) -> Self {
        Self {
            last_accessed: now,
            size_bytes,
            origin_uri: origin_uri.into(),
        }
    }

    /// Returns true if the entry was last used more than `max_age` before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.last_accessed > max_age
    }
}

/// Persisted collection of every entry plus the time of the last sweep.
///
/// Read-modify-written as a whole; callers serialise access to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheIndex {
    /// Schema version, always [`INDEX_VERSION`] for indexes this crate writes.
    pub version: u32,
    /// When the evictor last ran.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_cleanup_at: DateTime<Utc>,
    /// Entries keyed by cache key.
    #[serde(default)]
    pub files: BTreeMap<CacheKey, CacheEntry>,
}

impl CacheIndex {
    /// Creates an empty index whose cleanup clock starts at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: INDEX_VERSION,
            last_cleanup_at: now,
            files: BTreeMap::new(),
        }
    }

    /// Looks up an entry without touching it.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.files.get(key)
    }

    /// Inserts or overwrites an entry, returning the previous one.
    pub fn put(&mut self, key: CacheKey, entry: CacheEntry) -> Option<CacheEntry> {
        self.files.insert(key, entry)
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.files.remove(key)
    }

    /// Returns true if the key is indexed.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.files.contains_key(key)
    }

    /// Marks an entry as used at `now`.
    ///
    /// `lastAccessed` strictly increases on every touch, even when the clock has
    /// not advanced past the millisecond resolution of the index.
    pub fn touch(&mut self, key: &CacheKey, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.files.get_mut(key) else {
            return false;
        };
        let floor = entry.last_accessed + Duration::milliseconds(1);
        entry.last_accessed = now.max(floor);
        true
    }

    /// Sum of `sizeBytes` over every entry.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|e| e.size_bytes).sum()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no entries are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns true if more than `interval` has passed since the last sweep.
    #[must_use]
    pub fn cleanup_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        now - self.last_cleanup_at > interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ImageFormat;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_key_uses_full_uri() {
        let a = CacheKey::derive("https://a.example/pets/cat.jpg", None);
        let b = CacheKey::derive("https://b.example/pets/cat.jpg", None);
        assert_ne!(a, b);
        assert!(a.as_str().ends_with(".jpg"));
        assert_eq!(a.as_str().len(), 32 + ".jpg".len());
    }

    #[test]
    fn test_key_is_stable() {
        let uri = "https://storage.example/bucket/dog.png?token=abc";
        assert_eq!(CacheKey::derive(uri, None), CacheKey::derive(uri, None));
        assert!(CacheKey::derive(uri, None).as_str().ends_with(".png"));
    }

    #[test]
    fn test_key_separates_renditions() {
        let uri = "https://storage.example/bucket/cat.jpg";
        let low = TransformOptions::new(Some(600), None, 0.6, ImageFormat::Jpeg);
        let high = TransformOptions::new(Some(1200), None, 0.8, ImageFormat::Jpeg);

        let original = CacheKey::derive(uri, None);
        let low_key = CacheKey::derive(uri, Some(&low));
        let high_key = CacheKey::derive(uri, Some(&high));

        assert_ne!(original, low_key);
        assert_ne!(low_key, high_key);
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        let key = CacheKey::derive("https://cdn.example/avatar", None);
        assert!(key.as_str().ends_with(".img"));
    }

    #[test]
    fn test_touch_strictly_increases() {
        let mut index = CacheIndex::new(at(0));
        let key = CacheKey::new("k.jpg");
        index.put(key.clone(), CacheEntry::new("https://x/k.jpg", 10, at(1_000)));

        assert!(index.touch(&key, at(1_000)));
        assert_eq!(index.get(&key).unwrap().last_accessed, at(1_001));

        assert!(index.touch(&key, at(5_000)));
        assert_eq!(index.get(&key).unwrap().last_accessed, at(5_000));

        assert!(!index.touch(&CacheKey::new("missing.jpg"), at(6_000)));
    }

    #[test]
    fn test_json_layout() {
        let mut index = CacheIndex::new(at(1_700_000_000_000));
        index.put(
            CacheKey::new("abc.jpg"),
            CacheEntry::new("https://x/cat.jpg", 2048, at(1_700_000_000_500)),
        );

        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["lastCleanupAt"], 1_700_000_000_000_i64);
        assert_eq!(json["files"]["abc.jpg"]["lastAccessed"], 1_700_000_000_500_i64);
        assert_eq!(json["files"]["abc.jpg"]["size"], 2048);
        assert_eq!(json["files"]["abc.jpg"]["source"], "https://x/cat.jpg");

        let parsed: CacheIndex = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, index);
    }

    #[test]
    fn test_cleanup_due() {
        let index = CacheIndex::new(at(0));
        let day = Duration::days(1);
        assert!(!index.cleanup_due(at(day.num_milliseconds()), day));
        assert!(index.cleanup_due(at(day.num_milliseconds() + 1), day));
    }

    #[test]
    fn test_total_size() {
        let mut index = CacheIndex::new(at(0));
        index.put(CacheKey::new("a"), CacheEntry::new("u1", 100, at(0)));
        index.put(CacheKey::new("b"), CacheEntry::new("u2", 250, at(0)));
        assert_eq!(index.total_size(), 350);
        assert_eq!(index.len(), 2);
    }
}
