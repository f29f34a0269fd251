use crate::layers::catalog::Layer;
use crate::tiles::key::{MapTile, TileRange};

/// Append every tile of `range` to `out`, starting with the tile at `center`
/// and moving outward ring by ring.
///
/// The center is clamped into the range first. Ring `r` holds the tiles at
/// Chebyshev distance `r` from the center, visited along the bottom row, up
/// the right column, back along the top row and down the left column. `out`
/// is not cleared so callers can reuse one buffer across layers.
pub fn spiral_tiles(
    range: &TileRange,
    center: (i32, i32),
    layer: &'static Layer,
    out: &mut Vec<MapTile>,
) {
    let cx = center.0.clamp(range.min_x, range.max_x);
    let cy = center.1.clamp(range.min_y, range.max_y);

    let max_radius = (cx - range.min_x)
        .max(range.max_x - cx)
        .max(cy - range.min_y)
        .max(range.max_y - cy);

    out.reserve(range.len());
    out.push(MapTile::new(cx, cy, layer));

    let mut push = |x: i32, y: i32| {
        if range.contains(x, y) {
            out.push(MapTile::new(x, y, layer));
        }
    };

    for r in 1..=max_radius {
        let (left, right, bottom, top) = (cx - r, cx + r, cy - r, cy + r);
        for x in left..right {
            push(x, bottom);
        }
        for y in bottom..top {
            push(right, y);
        }
        for x in (left + 1..=right).rev() {
            push(x, top);
        }
        for y in (bottom + 1..=top).rev() {
            push(left, y);
        }
    }
}
