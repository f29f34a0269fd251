pub mod cache;
pub mod disk;
pub mod key;
pub mod loader;
pub mod memory;
pub mod source;

// Re-exports for convenience
pub use cache::{CacheManager, CacheStats, TileCache};
pub use key::{MapTile, TileRange};
pub use loader::{TileLoader, TileRequester, TileResult};
#[cfg(feature = "remote")]
pub use source::RemoteSource;
pub use source::{sources_from_config, ChainedSource, DirectorySource, TileSource};
