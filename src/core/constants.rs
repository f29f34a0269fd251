//! Engine-wide constants: grid extent, datum parameters, and the timing knobs
//! used by the renderer and the scroll/zoom controller.

/// Width of the national grid in metres (eastings run 0..GRID_WIDTH).
pub const GRID_WIDTH: f64 = 700_000.0;

/// Height of the national grid in metres (northings run 0..GRID_HEIGHT).
pub const GRID_HEIGHT: f64 = 1_300_000.0;

/// WGS84 ellipsoid semi-major axis (metres).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 ellipsoid semi-minor axis (metres).
pub const WGS84_B: f64 = 6_356_752.314_245;

/// Airy 1830 ellipsoid semi-major axis (metres).
pub const AIRY1830_A: f64 = 6_377_563.396;
/// Airy 1830 ellipsoid semi-minor axis (metres).
pub const AIRY1830_B: f64 = 6_356_256.909;

/// Helmert translation WGS84 -> OSGB36 (metres).
pub const HELMERT_TX: f64 = -446.448;
pub const HELMERT_TY: f64 = 125.157;
pub const HELMERT_TZ: f64 = -542.060;
/// Helmert rotations WGS84 -> OSGB36 (arc-seconds).
pub const HELMERT_RX: f64 = -0.1502;
pub const HELMERT_RY: f64 = -0.2470;
pub const HELMERT_RZ: f64 = -0.8421;
/// Helmert scale WGS84 -> OSGB36 (parts per million).
pub const HELMERT_S_PPM: f64 = 20.4894;

/// Scale factor on the central meridian.
pub const GRID_F0: f64 = 0.999_601_271_7;
/// True origin latitude (degrees north).
pub const GRID_LAT0: f64 = 49.0;
/// True origin longitude / central meridian (degrees east).
pub const GRID_LON0: f64 = -2.0;
/// Easting of the true origin (metres).
pub const GRID_E0: f64 = 400_000.0;
/// Northing of the true origin (metres).
pub const GRID_N0: f64 = -100_000.0;

/// Size of a grid-reference 100 km square.
pub const GRID_SQUARE_METRES: f64 = 100_000.0;

/// Renderer frame budget before the fetch quota starts refusing work.
pub const FETCH_SOFT_DEADLINE_MS: u64 = 10;
/// Renderer frame budget after which no fetch work is attempted at all.
pub const FETCH_HARD_DEADLINE_MS: u64 = 200;
/// Synchronous cache reads guaranteed per frame, even past the soft deadline.
pub const MIN_SYNC_READS_PER_FRAME: u32 = 1;
/// Asynchronous source fetches guaranteed per frame, even past the soft deadline.
pub const MIN_ASYNC_FETCHES_PER_FRAME: u32 = 4;

/// A draw pass walks at most this many times the tiles a screen of the
/// layer's own tiles would hold. Tiers far finer than the current scale are
/// skipped instead.
pub const MAX_PASS_TILE_FACTOR: usize = 16;

/// Duration of the cross-fade between resolution tiers.
pub const TIER_FADE_MS: u64 = 400;

/// Zoom animation duration bounds and heuristic coefficients.
pub const ZOOM_MIN_DURATION_MS: f64 = 250.0;
pub const ZOOM_MAX_DURATION_MS: f64 = 2500.0;
pub const ZOOM_MS_PER_LOG_SCALE: f64 = 400.0;

/// Fling deceleration in screen pixels per second squared.
pub const FLING_DECELERATION: f64 = 3400.0;
/// Fling launch speeds are clamped to this (pixels per second).
pub const FLING_MAX_SPEED: f64 = 8000.0;
/// Releases slower than this do not fling (pixels per second).
pub const FLING_MIN_SPEED: f64 = 50.0;

/// How far past the finest catalog scale the user may zoom in.
pub const MAX_OVERZOOM: f64 = 4.0;

/// Default remote tile endpoint.
pub const DEFAULT_TILE_API_URL: &str = "https://api.gridmap.example/osmapapi/ts";
