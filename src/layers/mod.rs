pub mod catalog;

pub use catalog::{
    layer_for_product_code, layers_for_product_codes, nearest_layer, nearest_layer_index,
    scale_ladder, Layer, LAYER_CATALOG,
};
