use crate::background::worker::BackgroundWorker;
use crate::tiles::key::MapTile;
use crate::tiles::source::TileSource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use fxhash::FxHashSet;
use std::sync::{Arc, Mutex};

/// Number of fetch threads when none is given
pub const DEFAULT_FETCH_THREADS: usize = 4;

/// Outcome of one tile request. `data` is `None` when the fetch failed or the
/// tile stopped being wanted before its turn came.
#[derive(Debug, Clone)]
pub struct TileResult {
    pub tile: MapTile,
    pub data: Option<Arc<Vec<u8>>>,
}

/// The renderer's view of an asynchronous tile fetcher
pub trait TileRequester {
    /// Whether a request for `tile` has been issued and not yet reported back
    fn is_pending(&self, tile: &MapTile) -> bool;

    /// Ask for `tile` to be fetched. Returns false if it was already pending.
    fn request(&mut self, tile: MapTile) -> bool;
}

/// Fetches tiles from a [`TileSource`] on background threads.
///
/// Results come back over a channel and are collected with [`TileLoader::drain`]
/// on the render thread. Each tile has at most one request in flight.
pub struct TileLoader {
    source: Arc<dyn TileSource>,
    workers: Vec<BackgroundWorker>,
    next_worker: usize,
    tx: Sender<TileResult>,
    rx: Receiver<TileResult>,
    in_flight: FxHashSet<MapTile>,
    wanted: Arc<Mutex<FxHashSet<MapTile>>>,
}

impl TileLoader {
    pub fn new(source: Arc<dyn TileSource>) -> Self {
        Self::with_threads(source, DEFAULT_FETCH_THREADS)
    }

    pub fn with_threads(source: Arc<dyn TileSource>, threads: usize) -> Self {
        let (tx, rx) = unbounded();
        let workers = (0..threads.max(1))
            .map(|i| BackgroundWorker::new(&format!("tile-fetch-{}", i)))
            .collect();
        Self {
            source,
            workers,
            next_worker: 0,
            tx,
            rx,
            in_flight: FxHashSet::default(),
            wanted: Arc::new(Mutex::new(FxHashSet::default())),
        }
    }

    /// Collect every result reported since the last call
    pub fn drain(&mut self) -> Vec<TileResult> {
        let results: Vec<TileResult> = self.rx.try_iter().collect();
        if !results.is_empty() {
            if let Ok(mut wanted) = self.wanted.lock() {
                for result in &results {
                    wanted.remove(&result.tile);
                }
            }
            for result in &results {
                self.in_flight.remove(&result.tile);
            }
        }
        results
    }

    /// Cancel queued requests for tiles that fail `keep`.
    ///
    /// A cancelled request still reports back (with no data) so it can be
    /// issued again later.
    pub fn retain_wanted<F>(&mut self, mut keep: F)
    where
        F: FnMut(&MapTile) -> bool,
    {
        if let Ok(mut wanted) = self.wanted.lock() {
            wanted.retain(|tile| keep(tile));
        }
    }

    /// Requests issued and not yet drained
    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Block until every queued fetch has run
    pub fn flush(&self) {
        for worker in &self.workers {
            worker.flush();
        }
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }
}

impl TileRequester for TileLoader {
    fn is_pending(&self, tile: &MapTile) -> bool {
        self.in_flight.contains(tile)
    }

    fn request(&mut self, tile: MapTile) -> bool {
        if !self.in_flight.insert(tile) {
            return false;
        }
        if let Ok(mut wanted) = self.wanted.lock() {
            wanted.insert(tile);
        }

        let source = self.source.clone();
        let wanted = self.wanted.clone();
        let tx = self.tx.clone();
        let worker = &self.workers[self.next_worker % self.workers.len()];
        self.next_worker = self.next_worker.wrapping_add(1);

        worker.execute(move || {
            let still_wanted = wanted.lock().map(|w| w.contains(&tile)).unwrap_or(true);
            let data = if still_wanted {
                match source.fetch_tile_bytes(&tile) {
                    Ok(bytes) => {
                        log::debug!("fetched tile {} ({} bytes)", tile, bytes.len());
                        Some(Arc::new(bytes))
                    }
                    Err(e) => {
                        log::warn!("tile {} from {} failed: {}", tile, source.name(), e);
                        None
                    }
                }
            } else {
                log::trace!("skipping tile {}, no longer visible", tile);
                None
            };
            // the loader may be gone by now
            let _ = tx.send(TileResult { tile, data });
        });
        true
    }
}
