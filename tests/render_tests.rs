use gridmap::layers::catalog::layers_for_product_codes;
use gridmap::rendering::renderer::FALLBACK_STEPS;
use gridmap::tiles::{TileRange, TileRequester};
use gridmap::{
    BoundingBox, FetchQuota, Layer, MapTile, ScrollPosition, TileCache, TileCanvas, TileImage,
    TileRenderer, Viewport,
};
use gridmap::core::viewport::ScreenRect;
use instant::Instant;
use std::sync::Arc;
use std::time::Duration;

/// Fallback selection, paint order and per-frame quota of the tile renderer
#[cfg(test)]
mod render_tests {
    use super::*;

    #[derive(Default)]
    struct MockCanvas {
        drawn: Vec<(MapTile, f32)>,
    }

    impl TileCanvas for MockCanvas {
        fn draw_tile(&mut self, tile: &MapTile, _image: &TileImage, _dest: ScreenRect, alpha: f32) {
            self.drawn.push((*tile, alpha));
        }
    }

    #[derive(Default)]
    struct MockRequester {
        requested: Vec<MapTile>,
    }

    impl TileRequester for MockRequester {
        fn is_pending(&self, tile: &MapTile) -> bool {
            self.requested.contains(tile)
        }

        fn request(&mut self, tile: MapTile) -> bool {
            self.requested.push(tile);
            true
        }
    }

    fn ladder() -> Vec<&'static Layer> {
        // 1, 2, 4, 5 and 10 metres per pixel
        layers_for_product_codes(["SV", "SVR", "VMDR", "50K", "50KR"])
    }

    fn layer(code: &str) -> &'static Layer {
        ladder().into_iter().find(|l| l.product_code == code).unwrap()
    }

    fn view(mpp: f64) -> Viewport {
        Viewport::new(ScrollPosition::at_rest(45_000.0, 45_000.0, mpp), 320.0, 320.0)
    }

    fn fill(cache: &TileCache, viewport: &Viewport, layer: &'static Layer) {
        let range = TileRange::covering(&viewport.visible_bounds(), layer).unwrap();
        for x in range.min_x..=range.max_x {
            for y in range.min_y..=range.max_y {
                cache.put_async(MapTile::new(x, y, layer), Arc::new(vec![0]));
            }
        }
    }

    /// Product codes in the order they first appear
    fn product_order(tiles: impl IntoIterator<Item = MapTile>) -> Vec<&'static str> {
        let mut order = Vec::new();
        for tile in tiles {
            if order.last() != Some(&tile.layer.product_code) {
                order.push(tile.layer.product_code);
            }
        }
        order
    }

    #[test]
    fn test_fallback_prefers_finer_then_coarser() {
        assert_eq!(FALLBACK_STEPS, [-1, 1, 2, 3]);

        let mut renderer = TileRenderer::new(ladder());
        let cache = TileCache::in_memory(1 << 20);
        let mut canvas = MockCanvas::default();
        let mut requester = MockRequester::default();

        let outcome = renderer.render(
            &view(4.0),
            Duration::ZERO,
            &mut FetchQuota::unlimited(),
            &cache,
            &mut requester,
            &mut canvas,
        );

        assert_eq!(outcome.base_layer.unwrap().product_code, "VMDR");
        assert!(outcome.need_redraw);
        assert_eq!(outcome.fallback_passes, 3);
        assert_eq!(
            product_order(requester.requested.iter().copied()),
            vec!["VMDR", "SVR", "50K", "50KR"]
        );
    }

    #[test]
    fn test_coarse_fallback_painted_under_finer() {
        let viewport = view(4.0);
        let mut renderer = TileRenderer::new(ladder());
        let cache = TileCache::in_memory(1 << 20);
        fill(&cache, &viewport, layer("50K"));
        cache.put_async(MapTile::new(90, 90, layer("SVR")), Arc::new(vec![0]));

        let mut canvas = MockCanvas::default();
        let outcome = renderer.render(
            &viewport,
            Duration::ZERO,
            &mut FetchQuota::unlimited(),
            &cache,
            &mut MockRequester::default(),
            &mut canvas,
        );

        assert_eq!(outcome.tiles_missing, 4);
        assert_eq!(outcome.fallback_passes, 2);
        assert_eq!(
            product_order(canvas.drawn.iter().map(|(t, _)| *t)),
            vec!["50K", "SVR"]
        );
        assert_eq!(outcome.tiles_drawn, 5);
    }

    #[test]
    fn test_complete_base_needs_no_redraw() {
        let viewport = view(1.0);
        let mut renderer = TileRenderer::new(ladder());
        let cache = TileCache::in_memory(1 << 20);
        fill(&cache, &viewport, layer("SV"));

        let mut canvas = MockCanvas::default();
        let outcome = renderer.render(
            &viewport,
            Duration::ZERO,
            &mut FetchQuota::unlimited(),
            &cache,
            &mut MockRequester::default(),
            &mut canvas,
        );
        assert!(!outcome.need_redraw);
        assert_eq!(outcome.fallback_passes, 0);
        assert!(canvas.drawn.iter().all(|(_, alpha)| *alpha == 1.0));

        // the drawn tiles cover the visible area exactly once
        let covered = canvas
            .drawn
            .iter()
            .fold(BoundingBox::NULL, |acc, (t, _)| acc.union(&t.bounds()));
        assert_eq!(covered.intersect(&viewport.visible_bounds()), viewport.visible_bounds());
    }

    #[test]
    fn test_zoom_animation_cross_fades_in_log_space() {
        let mut position = ScrollPosition::at_rest(45_000.0, 45_000.0, 2.0);
        position.animating_zoom = true;
        position.zoom_start_metres_per_pixel = 1.0;
        position.zoom_final_metres_per_pixel = 4.0;
        let viewport = Viewport::new(position, 320.0, 320.0);

        let mut renderer = TileRenderer::new(ladder());
        let cache = TileCache::in_memory(1 << 20);
        fill(&cache, &viewport, layer("SV"));

        let mut canvas = MockCanvas::default();
        let outcome = renderer.render(
            &viewport,
            Duration::ZERO,
            &mut FetchQuota::unlimited(),
            &cache,
            &mut MockRequester::default(),
            &mut canvas,
        );

        assert_eq!(outcome.base_layer.unwrap().product_code, "VMDR");
        assert!((outcome.alpha - 0.5).abs() < 1e-6);
        // only one translucent fallback tier while fading
        assert_eq!(outcome.fallback_passes, 1);
        assert!(outcome.need_redraw);
        // the outgoing tier is painted first, at full opacity
        let (first, alpha) = canvas.drawn[0];
        assert_eq!(first.layer.product_code, "SV");
        assert_eq!(alpha, 1.0);
    }

    #[test]
    fn test_quota_past_soft_deadline_limits_work() {
        let mut renderer = TileRenderer::new(ladder());
        let cache = TileCache::in_memory(1 << 20);
        let mut requester = MockRequester::default();
        let mut quota = FetchQuota::with_deadlines(
            Instant::now(),
            Duration::ZERO,
            Duration::from_secs(3600),
        );

        renderer.render(
            &view(1.0),
            Duration::ZERO,
            &mut quota,
            &cache,
            &mut requester,
            &mut MockCanvas::default(),
        );
        assert_eq!(requester.requested.len(), 4);
        assert_eq!(quota.sync_reads(), 1);
    }

    #[test]
    fn test_late_frame_leaves_cached_tiles_to_the_cache() {
        let viewport = view(1.0);
        let mut renderer = TileRenderer::new(ladder());
        let cache = TileCache::in_memory(1 << 20);
        fill(&cache, &viewport, layer("SV"));
        let mut requester = MockRequester::default();
        let mut quota = FetchQuota::with_deadlines(
            Instant::now(),
            Duration::ZERO,
            Duration::from_secs(3600),
        );

        let outcome = renderer.render(
            &viewport,
            Duration::ZERO,
            &mut quota,
            &cache,
            &mut requester,
            &mut MockCanvas::default(),
        );
        assert_eq!(outcome.tiles_drawn, 1);
        assert_eq!(outcome.tiles_missing, 3);
        assert!(outcome.need_redraw);
        // only the uncached fallback tier goes to the source
        assert!(!requester.requested.is_empty());
        assert!(requester.requested.iter().all(|t| t.layer.product_code != "SV"));
    }

    #[test]
    fn test_far_finer_tier_is_not_walked() {
        let layers = layers_for_product_codes(["SV", "OV0"]);
        let viewport = Viewport::new(
            ScrollPosition::at_rest(350_000.0, 650_000.0, 2500.0),
            320.0,
            320.0,
        );
        let mut renderer = TileRenderer::new(layers);
        let cache = TileCache::in_memory(1 << 20);
        let mut requester = MockRequester::default();

        let outcome = renderer.render(
            &viewport,
            Duration::ZERO,
            &mut FetchQuota::unlimited(),
            &cache,
            &mut requester,
            &mut MockCanvas::default(),
        );
        assert_eq!(outcome.base_layer.unwrap().product_code, "OV0");
        assert_eq!(outcome.fallback_passes, 0);
        assert_eq!(outcome.tiles_missing, 6);
        assert_eq!(renderer.visited().len(), 6);
        assert!(requester.requested.iter().all(|t| t.layer.product_code == "OV0"));
    }

    #[test]
    fn test_exhausted_quota_stops_walking() {
        let layers = layers_for_product_codes(["SV", "SVR", "VMDR"]);
        let mut renderer = TileRenderer::new(layers);
        let cache = TileCache::in_memory(1 << 20);
        let mut requester = MockRequester::default();
        let mut quota = FetchQuota::with_deadlines(Instant::now(), Duration::ZERO, Duration::ZERO);

        let outcome = renderer.render(
            &view(2.0),
            Duration::ZERO,
            &mut quota,
            &cache,
            &mut requester,
            &mut MockCanvas::default(),
        );
        assert_eq!(outcome.base_layer.unwrap().product_code, "SVR");
        assert_eq!(outcome.fallback_passes, 0);
        assert!(outcome.need_redraw);
        assert_eq!(outcome.tiles_missing, renderer.visited().len());
        assert!(renderer.visited().iter().all(|t| t.layer.product_code == "SVR"));
        assert!(requester.requested.is_empty());
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_quota_past_hard_deadline_does_nothing() {
        let viewport = view(1.0);
        let mut renderer = TileRenderer::new(ladder());
        let cache = TileCache::in_memory(1 << 20);
        fill(&cache, &viewport, layer("SV"));
        let mut requester = MockRequester::default();
        let mut canvas = MockCanvas::default();
        let mut quota = FetchQuota::with_deadlines(Instant::now(), Duration::ZERO, Duration::ZERO);

        let outcome = renderer.render(
            &viewport,
            Duration::ZERO,
            &mut quota,
            &cache,
            &mut requester,
            &mut canvas,
        );
        assert!(outcome.need_redraw);
        assert!(canvas.drawn.is_empty());
        assert!(requester.requested.is_empty());
    }
}
