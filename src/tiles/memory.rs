use crate::tiles::key::MapTile;
use lru::LruCache;
use std::sync::{Arc, Mutex};

/// In-memory tile tier: LRU eviction by cumulative byte size.
///
/// Safe to share between the render thread and background workers.
#[derive(Debug)]
pub struct MemoryCache {
    inner: Mutex<Inner>,
    budget_bytes: usize,
}

#[derive(Debug)]
struct Inner {
    entries: LruCache<MapTile, Arc<Vec<u8>>>,
    used_bytes: usize,
}

impl MemoryCache {
    /// Create a memory tier holding at most `budget_bytes` of tile data
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                used_bytes: 0,
            }),
            budget_bytes,
        }
    }

    /// Get a tile and mark it most recently used
    pub fn get(&self, tile: &MapTile) -> Option<Arc<Vec<u8>>> {
        self.inner.lock().ok()?.entries.get(tile).cloned()
    }

    /// Insert a tile, evicting the least recently used entries over budget.
    ///
    /// A single blob larger than the whole budget is not stored.
    pub fn put(&self, tile: MapTile, data: Arc<Vec<u8>>) {
        let size = data.len();
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        if let Some(old) = inner.entries.pop(&tile) {
            inner.used_bytes -= old.len();
        }
        if size > self.budget_bytes {
            log::debug!("tile {} ({} bytes) exceeds memory budget", tile, size);
            return;
        }

        inner.entries.put(tile, data);
        inner.used_bytes += size;

        while inner.used_bytes > self.budget_bytes {
            match inner.entries.pop_lru() {
                Some((evicted, bytes)) => {
                    inner.used_bytes -= bytes.len();
                    log::trace!("evicted tile {} from memory", evicted);
                }
                None => break,
            }
        }
    }

    /// Check if a tile is present without touching its recency
    pub fn contains(&self, tile: &MapTile) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.entries.contains(tile))
            .unwrap_or(false)
    }

    pub fn remove(&self, tile: &MapTile) -> Option<Arc<Vec<u8>>> {
        let mut inner = self.inner.lock().ok()?;
        let removed = inner.entries.pop(tile)?;
        inner.used_bytes -= removed.len();
        Some(removed)
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
            inner.used_bytes = 0;
        }
    }

    /// Number of cached tiles
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held
    pub fn used_bytes(&self) -> usize {
        self.inner.lock().map(|inner| inner.used_bytes).unwrap_or(0)
    }

    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }
}
