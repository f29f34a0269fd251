pub mod bounds;
pub mod config;
pub mod constants;
pub mod geo;
pub mod map;
pub mod projection;
pub mod viewport;

pub use bounds::BoundingBox;
pub use config::{CacheSettings, MapConfig};
pub use geo::{CoordinateSystem, GridReference, Point};
pub use map::GridMap;
pub use viewport::{CameraPosition, ScreenRect, ScrollPosition, Viewport};
