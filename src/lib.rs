//! # gridmap
//!
//! Tile map engine for a fixed national grid projection.
//!
//! The crate converts between WGS84 and grid coordinates, caches raster
//! tiles in memory and on disk, picks the resolution tier for the current
//! scale (falling back to neighbouring tiers while tiles load), and turns
//! gestures into a smoothly animated camera.

pub mod animation;
pub mod background;
pub mod core;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    bounds::BoundingBox,
    config::{CacheSettings, MapConfig},
    geo::{CoordinateSystem, GridReference, Point},
    map::GridMap,
    viewport::{CameraPosition, ScrollPosition, Viewport},
};

pub use layers::catalog::{Layer, LAYER_CATALOG};

pub use tiles::{CacheManager, MapTile, TileCache, TileSource};

pub use rendering::{FetchQuota, RenderOutcome, TileCanvas, TileImage, TileRenderer};

pub use input::{events::GestureEvent, controller::ScrollController};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "remote")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache journal error: {0}")]
    Journal(#[from] bincode::Error),

    #[error("Invalid grid reference: {0}")]
    InvalidGridReference(String),

    #[error("Tile {product}/{x}/{y} not found")]
    TileNotFound { product: String, x: i32, y: i32 },

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
}

/// Error type alias for convenience
pub type Error = MapError;
