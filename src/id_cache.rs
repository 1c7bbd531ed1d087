// Persistent place-id cache
// Maps canonical shelter URLs to resolved PlaceIDs so later runs can skip scraping detail pages

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::place_id::{accept_place_id, classify, PlaceId};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),
}

// Counters for one run; the cache is owned by a single control flow so plain integers suffice
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub loaded_count: usize,
    pub ignored_on_load: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub inserted_count: usize,
    pub rejected_count: usize,
}

// Missing, unreadable or corrupt files load as empty; unusable values are dropped
pub fn load_cache(path: &Path) -> BTreeMap<String, PlaceId> {
    load_with_stats(path).0
}

fn load_with_stats(path: &Path) -> (BTreeMap<String, PlaceId>, usize) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("No id cache at {}: {}", path.display(), e);
            return (BTreeMap::new(), 0);
        }
    };

    let raw: Map<String, Value> = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Ignoring unreadable id cache {}: {}", path.display(), e);
            return (BTreeMap::new(), 0);
        }
    };

    let total = raw.len();
    let entries: BTreeMap<String, PlaceId> = raw
        .into_iter()
        .filter_map(|(url, value)| classify(Some(&value)).map(|id| (url, id)))
        .collect();
    let ignored = total - entries.len();
    (entries, ignored)
}

// Write to a sibling `.tmp` file, then rename over the target
pub fn save_cache(path: Option<&Path>, entries: &BTreeMap<String, PlaceId>) -> Result<(), CacheError> {
    let Some(path) = path else {
        return Ok(());
    };

    let json = serde_json::to_string_pretty(entries)?;
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, json)?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    debug!("Saved {} cached place ids to {}", entries.len(), path.display());
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

pub struct IdCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, PlaceId>,
    dirty: bool,
    stats: CacheStats,
}

impl IdCache {
    // In-memory cache that is never loaded from or written to disk (`--no-cache`)
    pub fn disabled() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
            dirty: false,
            stats: CacheStats::default(),
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (entries, ignored) = load_with_stats(&path);
        let stats = CacheStats {
            loaded_count: entries.len(),
            ignored_on_load: ignored,
            ..CacheStats::default()
        };
        Self {
            path: Some(path),
            entries,
            dirty: false,
            stats,
        }
    }

    pub fn from_entries(entries: BTreeMap<String, PlaceId>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|(_, id)| accept_place_id(*id).is_some())
            .collect();
        Self {
            entries,
            ..Self::disabled()
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&mut self, url: &str) -> Option<PlaceId> {
        match self.entries.get(url).copied().and_then(accept_place_id) {
            Some(id) => {
                self.stats.hit_count += 1;
                Some(id)
            }
            None => {
                self.stats.miss_count += 1;
                None
            }
        }
    }

    // Returns false if the id is not a usable place id; such entries are never stored
    pub fn insert(&mut self, url: &str, id: PlaceId) -> bool {
        if accept_place_id(id).is_none() {
            self.stats.rejected_count += 1;
            return false;
        }
        if self.entries.insert(url.to_string(), id) != Some(id) {
            self.dirty = true;
        }
        self.stats.inserted_count += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // True once an insert changed the contents since load or the last save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn entries(&self) -> &BTreeMap<String, PlaceId> {
        &self.entries
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    pub fn save(&mut self) -> Result<(), CacheError> {
        save_cache(self.path.as_deref(), &self.entries)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entries() -> BTreeMap<String, PlaceId> {
        let mut entries = BTreeMap::new();
        entries.insert("https://book.example/sted/skovly/".to_string(), 1201);
        entries.insert("https://book.example/sted/fjordhytten/".to_string(), 88_412);
        entries.insert("https://book.example/sted/æblehaven/".to_string(), 7);
        entries
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids_cache.json");
        let entries = sample_entries();

        save_cache(Some(&path), &entries).unwrap();
        assert_eq!(load_cache(&path), entries);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids_cache.json");

        save_cache(Some(&path), &sample_entries()).unwrap();
        save_cache(Some(&path), &BTreeMap::new()).unwrap();

        assert!(path.exists());
        assert!(!temp_path_for(&path).exists());
        assert!(load_cache(&path).is_empty());
    }

    #[test]
    fn test_failed_rename_cleans_up_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory where the cache file should go makes the rename fail
        let path = dir.path().join("ids_cache.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let result = save_cache(Some(&path), &sample_entries());
        assert!(matches!(result, Err(CacheError::IoError(_))));
        assert!(!temp_path_for(&path).exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_save_without_path_is_noop() {
        assert!(save_cache(None, &sample_entries()).is_ok());

        let mut cache = IdCache::disabled();
        assert!(cache.insert("https://book.example/sted/a/", 11));
        assert!(cache.save().is_ok());
        assert!(cache.path().is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_cache(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids_cache.json");

        fs::write(&path, "{\"https://book.example/sted/a/\": 12").unwrap();
        assert!(load_cache(&path).is_empty());

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load_cache(&path).is_empty());
    }

    #[test]
    fn test_category_values_are_ignored_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids_cache.json");
        fs::write(
            &path,
            r#"{
                "https://book.example/sted/a/": 3012,
                "https://book.example/sted/b/": "3091",
                "https://book.example/sted/c/": 451,
                "https://book.example/sted/d/": "452",
                "https://book.example/sted/e/": "n/a",
                "https://book.example/sted/f/": null
            }"#,
        )
        .unwrap();

        let mut cache = IdCache::load(&path);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("https://book.example/sted/a/"), None);
        assert_eq!(cache.get("https://book.example/sted/b/"), None);
        assert_eq!(cache.get("https://book.example/sted/c/"), Some(451));
        assert_eq!(cache.get("https://book.example/sted/d/"), Some(452));

        let stats = cache.stats();
        assert_eq!(stats.loaded_count, 2);
        assert_eq!(stats.ignored_on_load, 4);
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 2);
    }

    #[test]
    fn test_insert_rejects_category_ids() {
        let mut cache = IdCache::disabled();
        assert!(!cache.insert("https://book.example/sted/a/", 3031));
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
        assert_eq!(cache.stats().rejected_count, 1);
    }

    #[test]
    fn test_dirty_tracking() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids_cache.json");
        save_cache(Some(&path), &sample_entries()).unwrap();

        let mut cache = IdCache::load(&path);
        assert!(!cache.is_dirty());

        // Same value again is not a change
        assert!(cache.insert("https://book.example/sted/skovly/", 1201));
        assert!(!cache.is_dirty());

        assert!(cache.insert("https://book.example/sted/ny/", 999));
        assert!(cache.is_dirty());

        cache.save().unwrap();
        assert!(!cache.is_dirty());
        assert_eq!(load_cache(&path).get("https://book.example/sted/ny/"), Some(&999));
    }

    #[test]
    fn test_from_entries_filters_invalid_ids() {
        let mut entries = sample_entries();
        entries.insert("https://book.example/sted/bad/".to_string(), 3012);

        let cache = IdCache::from_entries(entries);
        assert_eq!(cache.len(), 3);
    }
}
