use crate::core::config::MapConfig;
use crate::tiles::key::MapTile;
use crate::{MapError, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Anything that can produce the encoded image bytes of a tile.
///
/// Implementations block; callers run them on a background worker.
pub trait TileSource: Send + Sync {
    /// Fetch the encoded bytes of `tile`
    fn fetch_tile_bytes(&self, tile: &MapTile) -> Result<Vec<u8>>;

    /// Name used in log messages
    fn name(&self) -> &str;
}

/// Tiles stored as image files under a root directory.
///
/// Both `{root}/{product}/{x}_{y}.png` and `{root}/{product}_{x}_{y}.png`
/// layouts are accepted, in that order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn candidates(&self, tile: &MapTile) -> [PathBuf; 2] {
        let product = tile.layer.product_code;
        [
            self.root
                .join(product)
                .join(format!("{}_{}.png", tile.x, tile.y)),
            self.root.join(format!("{}.png", tile.disk_key())),
        ]
    }
}

impl TileSource for DirectorySource {
    fn fetch_tile_bytes(&self, tile: &MapTile) -> Result<Vec<u8>> {
        for path in self.candidates(tile) {
            match std::fs::read(&path) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(MapError::TileNotFound {
            product: tile.layer.product_code.to_string(),
            x: tile.x,
            y: tile.y,
        })
    }

    fn name(&self) -> &str {
        "directory"
    }
}

#[cfg(feature = "remote")]
mod remote {
    use super::*;
    use once_cell::sync::Lazy;
    use reqwest::blocking::Client;

    /// Shared blocking HTTP client. Building it once keeps the TLS setup and
    /// connection pool out of the per-tile path.
    pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
        Client::builder()
            .user_agent(concat!("gridmap/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .expect("failed to build reqwest blocking client")
    });

    /// The keyed WMS-style tile service
    #[derive(Debug, Clone)]
    pub struct RemoteSource {
        api_url: String,
        api_key: String,
    }

    impl RemoteSource {
        pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
            Self {
                api_url: api_url.into(),
                api_key: api_key.into(),
            }
        }

        /// Request URL for a tile: one `GetMap` call covering the tile's bounds
        pub fn tile_url(&self, tile: &MapTile) -> String {
            let bounds = tile.bounds();
            let layer = tile.layer;
            format!(
                "{}?FORMAT=image/png&KEY={}&SERVICE=WMS&VERSION=1.1.1&REQUEST=GetMap\
                 &LAYERS={}&PRODUCT={}&WIDTH={}&HEIGHT={}&BBOX={},{},{},{}",
                self.api_url,
                self.api_key,
                layer.layer_code,
                layer.product_code,
                layer.tile_size_pixels,
                layer.tile_size_pixels,
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y,
            )
        }
    }

    impl TileSource for RemoteSource {
        fn fetch_tile_bytes(&self, tile: &MapTile) -> Result<Vec<u8>> {
            let url = self.tile_url(tile);
            log::debug!("fetch tile {} from {}", tile, self.api_url);
            let response = HTTP_CLIENT.get(&url).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(MapError::Http {
                    status: status.as_u16(),
                    url: self.api_url.clone(),
                });
            }
            Ok(response.bytes()?.to_vec())
        }

        fn name(&self) -> &str {
            "remote"
        }
    }
}

#[cfg(feature = "remote")]
pub use remote::RemoteSource;

/// Tries each source in order, returning the first success
pub struct ChainedSource {
    sources: Vec<Arc<dyn TileSource>>,
}

impl ChainedSource {
    pub fn new(sources: Vec<Arc<dyn TileSource>>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl TileSource for ChainedSource {
    fn fetch_tile_bytes(&self, tile: &MapTile) -> Result<Vec<u8>> {
        let mut last_error = None;
        for source in &self.sources {
            match source.fetch_tile_bytes(tile) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    log::trace!("{} has no tile {}: {}", source.name(), tile, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| MapError::TileNotFound {
            product: tile.layer.product_code.to_string(),
            x: tile.x,
            y: tile.y,
        }))
    }

    fn name(&self) -> &str {
        "chain"
    }
}

/// Build the tile sources a configuration asks for: the offline directory
/// first, then the remote service when an API key is present.
///
/// An offline source that is not a directory (a packed tile-set database) is
/// not readable here; it is logged and left out.
pub fn sources_from_config(config: &MapConfig) -> ChainedSource {
    let mut sources: Vec<Arc<dyn TileSource>> = Vec::new();

    if let Some(path) = &config.offline_source {
        if path.is_dir() {
            sources.push(Arc::new(DirectorySource::new(path)));
        } else {
            log::warn!("offline source {:?} is not a tile directory, skipping it", path);
        }
    }

    #[cfg(feature = "remote")]
    {
        if let Some(key) = &config.api_key {
            sources.push(Arc::new(RemoteSource::new(config.api_url.clone(), key.clone())));
        }
    }

    if sources.is_empty() {
        log::warn!("no tile sources configured, only cached tiles will be shown");
    }
    ChainedSource::new(sources)
}
