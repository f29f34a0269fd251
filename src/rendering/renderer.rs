//! Per-frame tile selection with fallback tiers.
//!
//! Each frame the renderer picks the layer nearest the current scale, walks
//! the tiles covering the part of the screen still to be painted (the dirty
//! area), and resolves each one from a resident texture, the tile cache, or an
//! asynchronous fetch. Whatever stays unresolved is retried with neighbouring
//! tiers: one finer first, then up to three coarser.
//!
//! A pass that would walk far more tiles than fit on screen (a tier much finer
//! than the current scale) is skipped, and walking stops altogether once the
//! frame's fetch quota has run out.

use crate::core::bounds::BoundingBox;
use crate::core::constants::{MAX_PASS_TILE_FACTOR, TIER_FADE_MS};
use crate::core::viewport::{ScreenRect, Viewport};
use crate::layers::catalog::{nearest_layer_index, Layer};
use crate::rendering::quota::FetchQuota;
use crate::rendering::spiral::spiral_tiles;
use crate::tiles::cache::TileCache;
use crate::tiles::key::{MapTile, TileRange};
use crate::tiles::loader::TileRequester;
use fxhash::FxHashSet;
use std::sync::Arc;
use std::time::Duration;

/// Fallback tiers relative to the base layer, in preference order. Layers are
/// held finest first, so `-1` is one tier finer and positive steps are coarser.
pub const FALLBACK_STEPS: [isize; 4] = [-1, 1, 2, 3];

/// Image handed to the canvas for one tile
#[derive(Debug, Clone)]
pub enum TileImage {
    /// The canvas already holds a texture for this tile
    Bound,
    /// Encoded bytes from the cache, to be decoded and uploaded by the canvas
    Encoded(Arc<Vec<u8>>),
}

/// Drawing surface the renderer paints tiles onto
pub trait TileCanvas {
    /// Whether a texture for `tile` is already resident
    fn has_texture(&self, _tile: &MapTile) -> bool {
        false
    }

    /// Draw `tile` into `dest` (screen pixels) with the given opacity
    fn draw_tile(&mut self, tile: &MapTile, image: &TileImage, dest: ScreenRect, alpha: f32);
}

/// Summary of one rendered frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    /// The frame driver should schedule another frame without waiting for input
    pub need_redraw: bool,
    pub base_layer: Option<&'static Layer>,
    /// Opacity of the base tier
    pub alpha: f32,
    pub tiles_drawn: usize,
    /// Base tiles that could not be resolved this frame
    pub tiles_missing: usize,
    /// Fallback tiers consulted
    pub fallback_passes: usize,
}

#[derive(Debug, Clone, Copy)]
struct TierFade {
    outgoing: usize,
    elapsed: Duration,
}

#[derive(Debug, Clone)]
struct DrawOp {
    /// Paint order: lower first
    order: i64,
    tile: MapTile,
    image: TileImage,
    alpha: f32,
}

#[derive(Debug, Clone, Copy)]
struct PassResult {
    failed: BoundingBox,
    drawn: usize,
    missing: usize,
    /// Too many tiles to walk; nothing was attempted
    skipped: bool,
}

/// Stateful tile renderer. Owned by the render thread.
pub struct TileRenderer {
    layers: Vec<&'static Layer>,
    last_layer: Option<usize>,
    fade: Option<TierFade>,
    fade_duration: Duration,
    scratch: Vec<MapTile>,
    ops: Vec<DrawOp>,
    visited: FxHashSet<MapTile>,
}

impl TileRenderer {
    pub fn new(mut layers: Vec<&'static Layer>) -> Self {
        layers.sort_by(|a, b| a.metres_per_pixel().total_cmp(&b.metres_per_pixel()));
        Self {
            layers,
            last_layer: None,
            fade: None,
            fade_duration: Duration::from_millis(TIER_FADE_MS),
            scratch: Vec::new(),
            ops: Vec::new(),
            visited: FxHashSet::default(),
        }
    }

    pub fn layers(&self) -> &[&'static Layer] {
        &self.layers
    }

    /// Tiles enumerated with fetching allowed during the last frame
    pub fn visited(&self) -> &FxHashSet<MapTile> {
        &self.visited
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Render one frame.
    ///
    /// `elapsed` is the time since the previous frame and only drives the
    /// tier cross-fade.
    pub fn render(
        &mut self,
        viewport: &Viewport,
        elapsed: Duration,
        quota: &mut FetchQuota,
        cache: &TileCache,
        requester: &mut dyn TileRequester,
        canvas: &mut dyn TileCanvas,
    ) -> RenderOutcome {
        self.visited.clear();
        self.ops.clear();

        let position = viewport.position;
        let visible = viewport.visible_bounds();

        let Some((base, outgoing, alpha)) = self.select_tiers(viewport, elapsed) else {
            return RenderOutcome {
                need_redraw: position.is_animating(),
                base_layer: None,
                alpha: 1.0,
                tiles_drawn: 0,
                tiles_missing: 0,
                fallback_passes: 0,
            };
        };

        if let Some(outgoing) = outgoing {
            self.draw_pass(
                outgoing, visible, viewport, quota, cache, requester, canvas, false, 1.0, i64::MIN,
            );
        }

        let base_pass = self.draw_pass(
            base, visible, viewport, quota, cache, requester, canvas, true, alpha, i64::MAX,
        );
        let mut drawn = base_pass.drawn;
        let mut dirty = base_pass.failed;
        let mut fallback_passes = 0;

        for step in FALLBACK_STEPS {
            if dirty.is_null() || quota.is_exhausted() || (alpha < 1.0 && fallback_passes >= 1) {
                break;
            }
            let Some(index) = base.checked_add_signed(step).filter(|&i| i < self.layers.len())
            else {
                continue;
            };
            let pass = self.draw_pass(
                index,
                dirty,
                viewport,
                quota,
                cache,
                requester,
                canvas,
                true,
                alpha,
                -(index as i64),
            );
            if pass.skipped {
                continue;
            }
            log::trace!(
                "fallback {} drew {} tiles, {} missing",
                self.layers[index].product_code,
                pass.drawn,
                pass.missing
            );
            fallback_passes += 1;
            drawn += pass.drawn;
            dirty = pass.failed;
        }

        // coarse tiers first so finer tiles paint over them
        self.ops.sort_by_key(|op| op.order);
        for op in self.ops.drain(..) {
            let dest = viewport.bounds_to_screen(&op.tile.bounds());
            canvas.draw_tile(&op.tile, &op.image, dest, op.alpha);
        }

        RenderOutcome {
            need_redraw: base_pass.missing > 0 || position.is_animating() || self.fade.is_some(),
            base_layer: Some(self.layers[base]),
            alpha,
            tiles_drawn: drawn,
            tiles_missing: base_pass.missing,
            fallback_passes,
        }
    }

    /// Base layer index, the tier fading out (if any) and the base tier's alpha
    fn select_tiers(
        &mut self,
        viewport: &Viewport,
        elapsed: Duration,
    ) -> Option<(usize, Option<usize>, f32)> {
        let position = viewport.position;

        if position.animating_zoom {
            let start = position.zoom_start_metres_per_pixel;
            let end = position.zoom_final_metres_per_pixel;
            let base = nearest_layer_index(&self.layers, end)?;
            let outgoing = nearest_layer_index(&self.layers, start)?;
            self.fade = None;
            self.last_layer = Some(base);

            if outgoing == base {
                return Some((base, None, 1.0));
            }
            let alpha = ((position.metres_per_pixel.ln() - start.ln()) / (end.ln() - start.ln()))
                .clamp(0.0, 1.0);
            return Some((base, Some(outgoing), alpha as f32));
        }

        let base = nearest_layer_index(&self.layers, position.metres_per_pixel)?;
        match self.last_layer {
            Some(last) if last != base => {
                log::debug!(
                    "tier change {} -> {}",
                    self.layers[last].product_code,
                    self.layers[base].product_code
                );
                self.fade = Some(TierFade {
                    outgoing: last,
                    elapsed: Duration::ZERO,
                });
            }
            _ => {
                if let Some(fade) = &mut self.fade {
                    fade.elapsed += elapsed;
                }
            }
        }
        self.last_layer = Some(base);

        match self.fade {
            Some(fade) if fade.elapsed < self.fade_duration => {
                let alpha = fade.elapsed.as_secs_f32() / self.fade_duration.as_secs_f32();
                Some((base, Some(fade.outgoing), alpha))
            }
            Some(_) => {
                self.fade = None;
                Some((base, None, 1.0))
            }
            None => Some((base, None, 1.0)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_pass(
        &mut self,
        layer_index: usize,
        dirty: BoundingBox,
        viewport: &Viewport,
        quota: &mut FetchQuota,
        cache: &TileCache,
        requester: &mut dyn TileRequester,
        canvas: &mut dyn TileCanvas,
        fetch: bool,
        alpha: f32,
        order: i64,
    ) -> PassResult {
        let mut result = PassResult {
            failed: BoundingBox::NULL,
            drawn: 0,
            missing: 0,
            skipped: false,
        };
        let layer = self.layers[layer_index];
        let Some(range) = TileRange::covering(&dirty, layer) else {
            return result;
        };
        let budget = pass_tile_budget(viewport, layer);
        if range.len() > budget {
            log::debug!(
                "skipping {}: {} tiles over a budget of {}",
                layer.product_code,
                range.len(),
                budget
            );
            result.failed = dirty;
            result.skipped = true;
            return result;
        }

        let center = MapTile::containing(viewport.position.x, viewport.position.y, layer);
        let mut tiles = std::mem::take(&mut self.scratch);
        tiles.clear();
        spiral_tiles(&range, (center.x, center.y), layer, &mut tiles);

        for (i, tile) in tiles.iter().enumerate() {
            if quota.is_exhausted() {
                // out of time: keep the rest wanted and leave them dirty
                if fetch {
                    self.visited.extend(tiles[i..].iter().copied());
                }
                result.missing += tiles.len() - i;
                result.failed = result.failed.union(&dirty);
                break;
            }
            if fetch {
                self.visited.insert(*tile);
            }
            match resolve(tile, quota, cache, requester, canvas, fetch) {
                Some(image) => {
                    result.drawn += 1;
                    self.ops.push(DrawOp {
                        order,
                        tile: *tile,
                        image,
                        alpha,
                    });
                }
                None => {
                    result.missing += 1;
                    result.failed = result.failed.union(&tile.bounds().intersect(&dirty));
                }
            }
        }

        self.scratch = tiles;
        result
    }
}

/// Most tiles of `layer` a single pass may walk over this viewport
fn pass_tile_budget(viewport: &Viewport, layer: &Layer) -> usize {
    let tile_pixels = layer.tile_size_pixels.max(1) as f64;
    let across = (viewport.width / tile_pixels).ceil().max(0.0) + 1.0;
    let down = (viewport.height / tile_pixels).ceil().max(0.0) + 1.0;
    (across * down) as usize * MAX_PASS_TILE_FACTOR
}

/// Texture, then cache, then an async request within quota.
///
/// When no synchronous read is left, tiles either tier already holds wait for
/// a later frame instead of being fetched again.
fn resolve(
    tile: &MapTile,
    quota: &mut FetchQuota,
    cache: &TileCache,
    requester: &mut dyn TileRequester,
    canvas: &dyn TileCanvas,
    fetch: bool,
) -> Option<TileImage> {
    if canvas.has_texture(tile) {
        return Some(TileImage::Bound);
    }
    if quota.try_sync_read() {
        if let Some(bytes) = cache.get(tile) {
            return Some(TileImage::Encoded(bytes));
        }
    } else if cache.contains(tile) {
        return None;
    }
    if fetch && !requester.is_pending(tile) && quota.try_async_fetch() {
        requester.request(*tile);
    }
    None
}
