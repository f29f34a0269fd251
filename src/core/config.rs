//! Startup configuration: which tile sources are active, which products are
//! displayed, and how large the tile cache tiers may grow.
//!
//! Read once when the map is created; there is no hot reload.

use crate::core::constants::DEFAULT_TILE_API_URL;
use crate::layers::catalog::{layers_for_product_codes, Layer, LAYER_CATALOG};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Map configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Offline tiles: a directory of tile images
    pub offline_source: Option<PathBuf>,
    /// Key for the remote tile service; no key means no remote source
    pub api_key: Option<String>,
    /// Remote tile service endpoint
    pub api_url: String,
    /// Products to display; empty means every product the tier allows
    pub product_codes: BTreeSet<String>,
    /// Unlocks pro-only products
    pub pro: bool,
    pub cache: CacheSettings,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            offline_source: None,
            api_key: None,
            api_url: DEFAULT_TILE_API_URL.to_string(),
            product_codes: BTreeSet::new(),
            pro: false,
            cache: CacheSettings::default(),
        }
    }
}

impl MapConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Layers to render, finest first. Pro products are dropped for non-pro users.
    pub fn displayed_layers(&self) -> Vec<&'static Layer> {
        let layers = if self.product_codes.is_empty() {
            layers_for_product_codes(LAYER_CATALOG.iter().map(|l| l.product_code))
        } else {
            layers_for_product_codes(&self.product_codes)
        };
        layers
            .into_iter()
            .filter(|layer| self.pro || !layer.pro)
            .collect()
    }
}

/// Tile cache sizing. Two caches with equal settings are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Disk tier location; `None` keeps the cache in memory only
    pub directory: Option<PathBuf>,
    pub memory_budget_bytes: usize,
    pub disk_budget_bytes: u64,
    /// Generation tag for the disk tier (the application build number)
    pub app_version: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: None,
            memory_budget_bytes: 16 * 1024 * 1024,
            disk_budget_bytes: 256 * 1024 * 1024,
            app_version: 1,
        }
    }
}

impl CacheSettings {
    /// Memory budget of one eighth of the platform's memory class (in MiB)
    pub fn for_memory_class(memory_class_mb: usize) -> Self {
        Self {
            memory_budget_bytes: memory_class_mb * 1024 * 1024 / 8,
            ..Self::default()
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_app_version(mut self, app_version: u64) -> Self {
        self.app_version = app_version;
        self
    }

    pub fn with_disk_budget(mut self, bytes: u64) -> Self {
        self.disk_budget_bytes = bytes;
        self
    }
}
