//! Persistent tile tier: one file per tile plus an LRU journal.
//!
//! The journal records the generation the directory was written with and the
//! entries in least-to-most recently used order. Opening with a different
//! generation (the application build number) discards everything, so tiles
//! cut from an older product catalog never survive an upgrade.
//!
//! The journal is rewritten every [`JOURNAL_SYNC_INTERVAL`] writes, on
//! [`DiskCache::sync`] and on drop. Tile files the journal does not list (left
//! by a crash between syncs) are adopted on open as the least recently used
//! entries, so they still count against the byte budget.

use crate::Result;
use fxhash::FxHashSet;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const JOURNAL_FILE: &str = "journal.bin";
const ENTRY_EXTENSION: &str = "tile";
const TEMP_EXTENSION: &str = "tmp";

/// Writes between journal rewrites
pub const JOURNAL_SYNC_INTERVAL: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Journal {
    generation: u64,
    /// Oldest first
    entries: Vec<JournalEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
    key: String,
    size: u64,
}

/// Size-bounded LRU cache of byte blobs in a directory
#[derive(Debug)]
pub struct DiskCache {
    directory: PathBuf,
    generation: u64,
    max_bytes: u64,
    index: LruCache<String, u64>,
    used_bytes: u64,
    unsynced_writes: usize,
    journal_dirty: bool,
}

impl DiskCache {
    /// Open (or create) the cache in `directory`.
    ///
    /// Entries written under another generation, or a journal that cannot be
    /// read, leave an empty cache behind.
    pub fn open(directory: impl Into<PathBuf>, generation: u64, max_bytes: u64) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;

        let mut cache = Self {
            directory,
            generation,
            max_bytes,
            index: LruCache::unbounded(),
            used_bytes: 0,
            unsynced_writes: 0,
            journal_dirty: false,
        };

        match cache.read_journal() {
            Some(journal) if journal.generation == generation => {
                let unlisted = {
                    let listed: FxHashSet<&str> =
                        journal.entries.iter().map(|e| e.key.as_str()).collect();
                    cache.unlisted_entries(&listed)?
                };
                for (key, size) in unlisted {
                    log::debug!("adopting unjournaled entry {}", key);
                    cache.used_bytes += size;
                    cache.index.put(key, size);
                }
                for entry in journal.entries {
                    // skip entries whose file went missing behind our back
                    match fs::metadata(cache.entry_path(&entry.key)) {
                        Ok(meta) => {
                            cache.used_bytes += meta.len();
                            cache.index.put(entry.key, meta.len());
                        }
                        Err(_) => log::debug!("journal entry {} has no file", entry.key),
                    }
                }
                log::info!(
                    "opened disk cache {:?}: {} tiles, {} bytes",
                    cache.directory,
                    cache.index.len(),
                    cache.used_bytes
                );
            }
            Some(journal) => {
                log::info!(
                    "disk cache generation changed {} -> {}, discarding entries",
                    journal.generation,
                    generation
                );
                cache.wipe()?;
            }
            None => cache.wipe()?,
        }

        cache.trim()?;
        cache.write_journal()?;
        Ok(cache)
    }

    /// Read an entry, marking it most recently used
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        self.index.get(key)?;
        self.journal_dirty = true;
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("disk cache read of {} failed: {}", key, e);
                if let Some(size) = self.index.pop(key) {
                    self.used_bytes -= size;
                }
                None
            }
        }
    }

    /// Store an entry, evicting least recently used entries over budget
    pub fn put(&mut self, key: &str, data: &[u8]) -> Result<()> {
        let temp = self.directory.join(format!("{}.{}", key, TEMP_EXTENSION));
        fs::write(&temp, data)?;
        fs::rename(&temp, self.entry_path(key))?;

        if let Some(old) = self.index.put(key.to_string(), data.len() as u64) {
            self.used_bytes -= old;
        }
        self.used_bytes += data.len() as u64;
        self.journal_dirty = true;
        self.unsynced_writes += 1;

        self.trim()?;
        if self.unsynced_writes >= JOURNAL_SYNC_INTERVAL {
            self.sync()?;
        }
        Ok(())
    }

    /// Write the journal if anything changed since the last write
    pub fn sync(&mut self) -> Result<()> {
        if self.journal_dirty {
            self.write_journal()?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Drop an entry. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let Some(size) = self.index.pop(key) else {
            return Ok(false);
        };
        self.used_bytes -= size;
        remove_if_exists(&self.entry_path(key))?;
        self.write_journal()?;
        Ok(true)
    }

    /// Drop every entry
    pub fn clear(&mut self) -> Result<()> {
        self.wipe()?;
        self.write_journal()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn size_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    fn trim(&mut self) -> Result<()> {
        while self.used_bytes > self.max_bytes {
            let Some((key, size)) = self.index.pop_lru() else {
                break;
            };
            self.used_bytes -= size;
            remove_if_exists(&self.entry_path(&key))?;
            log::trace!("evicted {} from disk cache", key);
        }
        Ok(())
    }

    fn read_journal(&self) -> Option<Journal> {
        let bytes = match fs::read(self.directory.join(JOURNAL_FILE)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("cannot read disk cache journal: {}", e);
                return None;
            }
        };
        match bincode::deserialize(&bytes) {
            Ok(journal) => Some(journal),
            Err(e) => {
                log::warn!("corrupt disk cache journal, starting empty: {}", e);
                None
            }
        }
    }

    fn write_journal(&mut self) -> Result<()> {
        let journal = Journal {
            generation: self.generation,
            entries: self
                .index
                .iter()
                .rev()
                .map(|(key, size)| JournalEntry {
                    key: key.clone(),
                    size: *size,
                })
                .collect(),
        };
        let bytes = bincode::serialize(&journal)?;
        let temp = self.directory.join(format!("{}.{}", JOURNAL_FILE, TEMP_EXTENSION));
        fs::write(&temp, bytes)?;
        fs::rename(&temp, self.directory.join(JOURNAL_FILE))?;
        self.journal_dirty = false;
        self.unsynced_writes = 0;
        Ok(())
    }

    /// Entry files on disk missing from `listed`, with their sizes
    fn unlisted_entries(&self, listed: &FxHashSet<&str>) -> Result<Vec<(String, u64)>> {
        let mut unlisted = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !listed.contains(key) {
                unlisted.push((key.to_string(), entry.metadata()?.len()));
            }
        }
        Ok(unlisted)
    }

    /// Remove every entry file and forget the index
    fn wipe(&mut self) -> Result<()> {
        self.index.clear();
        self.used_bytes = 0;
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let ours = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == ENTRY_EXTENSION || ext == TEMP_EXTENSION)
                .unwrap_or(false);
            if ours {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }
}

impl Drop for DiskCache {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            log::warn!("cannot write disk cache journal for {:?}: {}", self.directory, e);
        }
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_persist() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cache = DiskCache::open(dir.path(), 7, 1_000).unwrap();
            cache.put("SV_1_2", &[1, 2, 3]).unwrap();
            assert_eq!(cache.get("SV_1_2"), Some(vec![1, 2, 3]));
            assert_eq!(cache.size_bytes(), 3);
        }
        let mut reopened = DiskCache::open(dir.path(), 7, 1_000).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("SV_1_2"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_new_generation_discards_entries() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cache = DiskCache::open(dir.path(), 1, 1_000).unwrap();
            cache.put("SV_1_2", &[1, 2, 3]).unwrap();
        }
        let mut upgraded = DiskCache::open(dir.path(), 2, 1_000).unwrap();
        assert!(upgraded.is_empty());
        assert_eq!(upgraded.get("SV_1_2"), None);
        assert!(!dir.path().join("SV_1_2.tile").exists());
    }

    #[test]
    fn test_lru_eviction_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = DiskCache::open(dir.path(), 1, 10).unwrap();
        cache.put("a", &[0; 4]).unwrap();
        cache.put("b", &[0; 4]).unwrap();
        assert!(cache.get("a").is_some());
        cache.put("c", &[0; 4]).unwrap();

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.size_bytes(), 8);
        assert!(!dir.path().join("b.tile").exists());
    }

    #[test]
    fn test_corrupt_journal_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(JOURNAL_FILE), b"not a journal").unwrap();
        fs::write(dir.path().join("stale.tile"), b"x").unwrap();
        let cache = DiskCache::open(dir.path(), 1, 100).unwrap();
        assert!(cache.is_empty());
        assert!(!dir.path().join("stale.tile").exists());
    }

    #[test]
    fn test_journal_written_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join(JOURNAL_FILE);
        let mut cache = DiskCache::open(dir.path(), 1, 1_000).unwrap();
        let opened = fs::read(&journal).unwrap();

        cache.put("a", &[1]).unwrap();
        assert_eq!(fs::read(&journal).unwrap(), opened);
        for i in 1..JOURNAL_SYNC_INTERVAL {
            cache.put(&format!("k{}", i), &[1]).unwrap();
        }
        assert_ne!(fs::read(&journal).unwrap(), opened);

        cache.put("late", &[1]).unwrap();
        cache.sync().unwrap();
        assert!(DiskCache::open(dir.path(), 1, 1_000).unwrap().contains("late"));
    }

    #[test]
    fn test_unjournaled_files_are_adopted() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cache = DiskCache::open(dir.path(), 3, 10).unwrap();
            cache.put("a", &[0; 4]).unwrap();
        }
        // written behind the journal's back
        fs::write(dir.path().join("orphan.tile"), [0; 4]).unwrap();

        let mut cache = DiskCache::open(dir.path(), 3, 10).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.size_bytes(), 8);

        // the adopted file is the first to go
        cache.put("b", &[0; 4]).unwrap();
        assert!(!cache.contains("orphan"));
        assert!(!dir.path().join("orphan.tile").exists());
        assert!(cache.contains("a"));
        assert!(cache.size_bytes() <= 10);
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = DiskCache::open(dir.path(), 1, 100).unwrap();
        cache.put("a", &[1]).unwrap();
        cache.put("b", &[2, 2]).unwrap();
        assert!(cache.remove("a").unwrap());
        assert!(!cache.remove("a").unwrap());
        assert_eq!(cache.size_bytes(), 2);
        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }
}
