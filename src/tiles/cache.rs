use crate::background::worker::BackgroundWorker;
use crate::core::config::CacheSettings;
use crate::tiles::disk::DiskCache;
use crate::tiles::key::MapTile;
use crate::tiles::memory::MemoryCache;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Hit/miss counters per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub disk_write_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    disk_write_failures: AtomicU64,
}

/// Two-tier tile cache: a byte-budgeted memory LRU in front of a
/// generation-versioned disk LRU.
///
/// Reads are synchronous. Writes land in memory immediately and reach the disk
/// on a background worker. Disk hits are returned without being copied back
/// into memory. Disk failures are logged and the cache carries on as if the
/// tier were empty.
pub struct TileCache {
    settings: CacheSettings,
    memory: MemoryCache,
    /// Emptied when the instance is replaced, so one directory only ever has
    /// one live journal
    disk: Arc<Mutex<Option<DiskCache>>>,
    disk_attached: AtomicBool,
    writer: BackgroundWorker,
    counters: Arc<Counters>,
}

impl TileCache {
    /// Open a cache for the given settings
    pub fn open(settings: CacheSettings) -> Self {
        let disk = settings.directory.as_ref().and_then(|directory| {
            match DiskCache::open(directory, settings.app_version, settings.disk_budget_bytes) {
                Ok(disk) => Some(disk),
                Err(e) => {
                    log::error!("disk tile cache unavailable at {:?}: {}", directory, e);
                    None
                }
            }
        });

        Self {
            memory: MemoryCache::new(settings.memory_budget_bytes),
            disk_attached: AtomicBool::new(disk.is_some()),
            disk: Arc::new(Mutex::new(disk)),
            writer: BackgroundWorker::new("tile-cache-writer"),
            counters: Arc::new(Counters::default()),
            settings,
        }
    }

    /// A cache with no disk tier
    pub fn in_memory(memory_budget_bytes: usize) -> Self {
        Self::open(CacheSettings {
            directory: None,
            memory_budget_bytes,
            ..CacheSettings::default()
        })
    }

    /// Look a tile up in memory, then on disk
    pub fn get(&self, tile: &MapTile) -> Option<Arc<Vec<u8>>> {
        if let Some(bytes) = self.memory.get(tile) {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            return Some(bytes);
        }

        let from_disk = if self.has_disk_tier() {
            self.disk
                .lock()
                .ok()
                .and_then(|mut disk| disk.as_mut()?.get(&tile.disk_key()))
        } else {
            None
        };

        match from_disk {
            Some(bytes) => {
                self.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::new(bytes))
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Whether either tier holds `tile`. Only consults in-memory indexes, so
    /// it never touches the disk.
    pub fn contains(&self, tile: &MapTile) -> bool {
        if self.memory.contains(tile) {
            return true;
        }
        self.has_disk_tier()
            && self
                .disk
                .lock()
                .ok()
                .and_then(|disk| disk.as_ref().map(|disk| disk.contains(&tile.disk_key())))
                .unwrap_or(false)
    }

    /// Store a tile: in memory now, on disk in the background
    pub fn put_async(&self, tile: MapTile, data: Arc<Vec<u8>>) {
        self.memory.put(tile, data.clone());

        if !self.has_disk_tier() {
            return;
        }
        let disk = self.disk.clone();
        let counters = self.counters.clone();
        let key = tile.disk_key();
        self.writer.execute(move || {
            let result = match disk.lock() {
                Ok(mut guard) => match guard.as_mut() {
                    Some(disk) => disk.put(&key, &data),
                    None => return,
                },
                Err(_) => return,
            };
            if let Err(e) = result {
                counters.disk_write_failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("disk cache write of {} failed: {}", key, e);
            }
        });
    }

    /// Wait for every queued disk write to finish and persist the journal
    pub fn flush(&self) {
        self.writer.flush();
        if let Ok(mut guard) = self.disk.lock() {
            if let Some(disk) = guard.as_mut() {
                if let Err(e) = disk.sync() {
                    log::warn!("disk cache journal sync failed: {}", e);
                }
            }
        }
    }

    /// Finish pending writes and close the disk tier. The cache keeps serving
    /// from memory only.
    pub fn release_disk_tier(&self) {
        self.writer.flush();
        self.disk_attached.store(false, Ordering::SeqCst);
        let released = match self.disk.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(disk) = released {
            log::info!("released disk tile cache {:?}", disk.directory());
            // dropping writes the journal
            drop(disk);
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn has_disk_tier(&self) -> bool {
        self.disk_attached.load(Ordering::SeqCst)
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.counters.disk_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            disk_write_failures: self.counters.disk_write_failures.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("settings", &self.settings)
            .field("memory_tiles", &self.memory.len())
            .field("disk", &self.has_disk_tier())
            .finish()
    }
}

/// Owns the active [`TileCache`] and replaces it whenever the settings change
/// (memory budget, disk budget, app version or directory).
///
/// A replaced instance loses its disk tier, so holders of the old `Arc` keep
/// working from memory while the new instance owns the directory.
#[derive(Debug, Default)]
pub struct CacheManager {
    current: Mutex<Option<Arc<TileCache>>>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache for `settings`, reusing the active one when nothing changed
    pub fn cache_for(&self, settings: &CacheSettings) -> Arc<TileCache> {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(cache) = current.as_ref() {
            if cache.settings() == settings {
                return cache.clone();
            }
            log::info!("tile cache settings changed, reopening");
            cache.release_disk_tier();
        }

        let cache = Arc::new(TileCache::open(settings.clone()));
        *current = Some(cache.clone());
        cache
    }

    /// The active cache, if any
    pub fn current(&self) -> Option<Arc<TileCache>> {
        self.current.lock().ok()?.clone()
    }
}
