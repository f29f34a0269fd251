use crate::core::bounds::BoundingBox;
use crate::layers::catalog::Layer;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A tile of one layer, addressed by its column and row in tile space.
///
/// Tile `(x, y)` covers grid metres `[x * size, (x + 1) * size)` east and
/// `[y * size, (y + 1) * size)` north. Cheap to copy; used directly as the
/// cache key.
#[derive(Debug, Clone, Copy)]
pub struct MapTile {
    pub x: i32,
    pub y: i32,
    pub layer: &'static Layer,
}

impl MapTile {
    pub fn new(x: i32, y: i32, layer: &'static Layer) -> Self {
        Self { x, y, layer }
    }

    /// The tile containing a grid position
    pub fn containing(easting: f64, northing: f64, layer: &'static Layer) -> Self {
        let size = layer.tile_size_metres as f64;
        Self::new(
            (easting / size).floor() as i32,
            (northing / size).floor() as i32,
            layer,
        )
    }

    /// Grid area covered by this tile
    pub fn bounds(&self) -> BoundingBox {
        let size = self.layer.tile_size_metres as f64;
        BoundingBox::new(
            self.x as f64 * size,
            self.y as f64 * size,
            (self.x + 1) as f64 * size,
            (self.y + 1) as f64 * size,
        )
    }

    /// Stable name used by the disk tier: `"{productCode}_{x}_{y}"`
    pub fn disk_key(&self) -> String {
        format!("{}_{}_{}", self.layer.product_code, self.x, self.y)
    }
}

/// Inclusive range of tile columns and rows covering a grid box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl TileRange {
    /// Tiles of `layer` overlapping `bounds`; `None` for a null or empty box.
    pub fn covering(bounds: &BoundingBox, layer: &Layer) -> Option<Self> {
        if !bounds.is_proper() {
            return None;
        }
        let size = layer.tile_size_metres as f64;
        let range = Self {
            min_x: (bounds.min_x / size).floor() as i32,
            min_y: (bounds.min_y / size).floor() as i32,
            // the max edge is exclusive
            max_x: (bounds.max_x / size).ceil() as i32 - 1,
            max_y: (bounds.max_y / size).ceil() as i32 - 1,
        };
        (range.min_x <= range.max_x && range.min_y <= range.max_y).then_some(range)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn len(&self) -> usize {
        ((self.max_x - self.min_x + 1) as usize) * ((self.max_y - self.min_y + 1) as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for MapTile {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.layer.product_code == other.layer.product_code
    }
}

impl Eq for MapTile {}

impl Hash for MapTile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.layer.product_code.hash(state);
        self.x.hash(state);
        self.y.hash(state);
    }
}

impl fmt::Display for MapTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.layer.product_code, self.x, self.y)
    }
}
