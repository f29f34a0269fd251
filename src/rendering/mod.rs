pub mod quota;
pub mod renderer;
pub mod spiral;

// Re-export main types
pub use quota::FetchQuota;
pub use renderer::{RenderOutcome, TileCanvas, TileImage, TileRenderer, FALLBACK_STEPS};
