//! Prelude module for common gridmap types and traits
//!
//! Re-exports what an embedding application usually needs, for importing
//! with `use gridmap::prelude::*;`

pub use crate::core::{
    bounds::BoundingBox,
    config::{CacheSettings, MapConfig},
    geo::{CoordinateSystem, GridReference, Point},
    map::GridMap,
    viewport::{CameraPosition, ScreenRect, ScrollPosition, Viewport},
};

pub use crate::layers::catalog::{layers_for_product_codes, nearest_layer, Layer};

pub use crate::tiles::{
    CacheManager, CacheStats, DirectorySource, MapTile, TileCache, TileLoader, TileSource,
};

pub use crate::rendering::{FetchQuota, RenderOutcome, TileCanvas, TileImage, TileRenderer};

pub use crate::input::{GestureEvent, ScrollController};

pub use crate::{MapError, Result};

/// Fast hash collections used on the render path
pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
