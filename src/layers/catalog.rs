//! Static table of raster resolution tiers.

use serde::Serialize;

/// One resolution tier of the tile pyramid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Layer {
    /// Product the tiles are cut from, also the cache key prefix
    pub product_code: &'static str,
    /// Layer name sent to the remote tile service
    pub layer_code: &'static str,
    pub tile_size_pixels: u32,
    pub tile_size_metres: u32,
    /// Only available to pro-tier users
    pub pro: bool,
}

impl Layer {
    pub const fn new(
        product_code: &'static str,
        layer_code: &'static str,
        tile_size_pixels: u32,
        tile_size_metres: u32,
        pro: bool,
    ) -> Self {
        Self {
            product_code,
            layer_code,
            tile_size_pixels,
            tile_size_metres,
            pro,
        }
    }

    pub fn metres_per_pixel(&self) -> f64 {
        self.tile_size_metres as f64 / self.tile_size_pixels as f64
    }
}

/// Every known product, sorted by product code.
pub static LAYER_CATALOG: [Layer; 15] = [
    Layer::new("250K", "25", 200, 5_000, false),
    Layer::new("250KR", "50", 200, 10_000, false),
    Layer::new("25K", "2.5", 250, 625, true),
    Layer::new("25KR", "4", 250, 1_000, true),
    Layer::new("50K", "5", 200, 1_000, false),
    Layer::new("50KR", "10", 200, 2_000, false),
    Layer::new("MS", "100", 250, 25_000, false),
    Layer::new("MSR", "200", 250, 50_000, false),
    Layer::new("OV0", "2500", 200, 500_000, false),
    Layer::new("OV1", "1000", 200, 200_000, false),
    Layer::new("OV2", "500", 200, 100_000, false),
    Layer::new("SV", "1", 250, 250, false),
    Layer::new("SVR", "2", 250, 500, false),
    Layer::new("VMD", "2.5", 200, 500, false),
    Layer::new("VMDR", "4", 250, 1_000, false),
];

/// Looks up a single product
pub fn layer_for_product_code(code: &str) -> Option<&'static Layer> {
    LAYER_CATALOG
        .binary_search_by(|layer| layer.product_code.cmp(code))
        .ok()
        .map(|i| &LAYER_CATALOG[i])
}

/// Layers for the given product codes, finest first. Unknown codes are skipped.
pub fn layers_for_product_codes<I, S>(codes: I) -> Vec<&'static Layer>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut layers: Vec<&'static Layer> = codes
        .into_iter()
        .filter_map(|code| layer_for_product_code(code.as_ref()))
        .collect();
    layers.sort_by(|a, b| a.metres_per_pixel().total_cmp(&b.metres_per_pixel()));
    layers.dedup_by(|a, b| a.product_code == b.product_code);
    layers
}

/// Index of the layer whose scale is closest to `metres_per_pixel` in log space.
///
/// Log distance treats a halving and a doubling of the scale the same way.
pub fn nearest_layer_index(layers: &[&Layer], metres_per_pixel: f64) -> Option<usize> {
    let target = metres_per_pixel.ln();
    layers
        .iter()
        .enumerate()
        .map(|(i, layer)| (i, (layer.metres_per_pixel().ln() - target).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// The layer whose scale is closest to `metres_per_pixel` in log space
pub fn nearest_layer<'a>(layers: &[&'a Layer], metres_per_pixel: f64) -> Option<&'a Layer> {
    nearest_layer_index(layers, metres_per_pixel).map(|i| layers[i])
}

/// Distinct scales of the given layers, ascending
pub fn scale_ladder(layers: &[&Layer]) -> Vec<f64> {
    let mut scales: Vec<f64> = layers.iter().map(|l| l.metres_per_pixel()).collect();
    scales.sort_by(f64::total_cmp);
    scales.dedup();
    scales
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sorted_by_product_code() {
        for pair in LAYER_CATALOG.windows(2) {
            assert!(pair[0].product_code < pair[1].product_code);
        }
    }

    #[test]
    fn test_metres_per_pixel() {
        let layer = layer_for_product_code("50K").unwrap();
        assert_eq!(layer.metres_per_pixel(), 5.0);
        assert_eq!(layer_for_product_code("OV0").unwrap().metres_per_pixel(), 2500.0);
    }

    #[test]
    fn test_layers_for_product_codes_sorted_and_filtered() {
        let layers = layers_for_product_codes(["OV0", "nope", "SV", "50K", "SV"]);
        let codes: Vec<_> = layers.iter().map(|l| l.product_code).collect();
        assert_eq!(codes, vec!["SV", "50K", "OV0"]);
        assert!(layers_for_product_codes(["unknown"]).is_empty());
    }

    #[test]
    fn test_nearest_layer_log_distance() {
        let layers = layers_for_product_codes(["SV", "SVR", "VMDR", "50K"]);
        assert_eq!(nearest_layer(&layers, 1.0).unwrap().product_code, "SV");
        assert_eq!(nearest_layer(&layers, 1.3).unwrap().product_code, "SV");
        assert_eq!(nearest_layer(&layers, 1.5).unwrap().product_code, "SVR");
        assert_eq!(nearest_layer(&layers, 100.0).unwrap().product_code, "50K");
        assert_eq!(nearest_layer(&layers, 0.01).unwrap().product_code, "SV");
        assert!(nearest_layer(&[], 1.0).is_none());
    }

    #[test]
    fn test_scale_ladder() {
        let layers = layers_for_product_codes(["VMD", "25K", "SV"]);
        assert_eq!(scale_ladder(&layers), vec![1.0, 2.5]);
    }
}
