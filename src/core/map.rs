use crate::core::config::MapConfig;
use crate::core::viewport::Viewport;
use crate::input::controller::ScrollController;
use crate::layers::catalog::Layer;
use crate::rendering::quota::FetchQuota;
use crate::rendering::renderer::{RenderOutcome, TileCanvas, TileRenderer};
use crate::tiles::cache::TileCache;
use crate::tiles::loader::TileLoader;
use crate::tiles::source::{sources_from_config, TileSource};
use std::sync::Arc;
use std::time::Duration;

/// The map engine as seen by the platform.
///
/// Gestures go to the shared [`ScrollController`] from any thread. The frame
/// driver calls [`GridMap::on_frame`] on the render thread and schedules
/// another frame whenever it returns true.
pub struct GridMap {
    controller: Arc<ScrollController>,
    renderer: TileRenderer,
    loader: TileLoader,
    cache: Arc<TileCache>,
}

impl GridMap {
    /// Build a map from startup configuration
    pub fn new(config: &MapConfig, cache: Arc<TileCache>) -> Self {
        let source = Arc::new(sources_from_config(config));
        let layers = config.displayed_layers();
        if layers.is_empty() {
            log::warn!("no displayable products in configuration");
        }
        Self::with_source(layers, source, cache)
    }

    /// Build a map over explicit layers and tile source
    pub fn with_source(
        layers: Vec<&'static Layer>,
        source: Arc<dyn TileSource>,
        cache: Arc<TileCache>,
    ) -> Self {
        Self {
            controller: Arc::new(ScrollController::new(&layers)),
            renderer: TileRenderer::new(layers),
            loader: TileLoader::new(source),
            cache,
        }
    }

    /// Handle for delivering gestures and camera commands
    pub fn controller(&self) -> &Arc<ScrollController> {
        &self.controller
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    pub fn layers(&self) -> &[&'static Layer] {
        self.renderer.layers()
    }

    pub fn set_viewport_size(&self, width: f64, height: f64) {
        self.controller.set_viewport_size(width, height);
    }

    /// Render one frame. Returns true if another frame should follow soon.
    pub fn on_frame(&mut self, elapsed: Duration, canvas: &mut dyn TileCanvas) -> bool {
        self.render_frame(elapsed, canvas).need_redraw
    }

    /// Like [`GridMap::on_frame`], returning the full frame summary
    pub fn render_frame(&mut self, elapsed: Duration, canvas: &mut dyn TileCanvas) -> RenderOutcome {
        let mut arrived = 0;
        for result in self.loader.drain() {
            if let Some(data) = result.data {
                self.cache.put_async(result.tile, data);
                arrived += 1;
            }
        }
        if arrived > 0 {
            log::trace!("{} tiles arrived", arrived);
        }

        let position = self.controller.tick(elapsed);
        let (width, height) = self.controller.viewport_size();
        let viewport = Viewport::new(position, width, height);

        let mut quota = FetchQuota::starting_now();
        let mut outcome = self.renderer.render(
            &viewport,
            elapsed,
            &mut quota,
            &self.cache,
            &mut self.loader,
            canvas,
        );

        let visited = self.renderer.visited();
        self.loader.retain_wanted(|tile| visited.contains(tile));

        outcome.need_redraw |= arrived > 0;
        outcome
    }

    /// Wait for queued fetches and cache writes to finish
    pub fn flush(&self) {
        self.loader.flush();
        self.cache.flush();
    }
}
