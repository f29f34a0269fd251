use crate::core::bounds::BoundingBox;
use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Camera state sampled once per frame by the scroll controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
    /// Center easting in grid metres
    pub x: f64,
    /// Center northing in grid metres
    pub y: f64,
    /// Current scale
    pub metres_per_pixel: f64,
    pub animating_scroll: bool,
    pub animating_zoom: bool,
    /// Scale at the start of the running zoom animation
    pub zoom_start_metres_per_pixel: f64,
    /// Scale the running zoom animation is heading to
    pub zoom_final_metres_per_pixel: f64,
}

impl ScrollPosition {
    /// A resting position with no animation in progress
    pub fn at_rest(x: f64, y: f64, metres_per_pixel: f64) -> Self {
        Self {
            x,
            y,
            metres_per_pixel,
            animating_scroll: false,
            animating_zoom: false,
            zoom_start_metres_per_pixel: metres_per_pixel,
            zoom_final_metres_per_pixel: metres_per_pixel,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animating_scroll || self.animating_zoom
    }

    pub fn center(&self) -> Point {
        Point::grid(self.x, self.y)
    }
}

/// Public, immutable camera description used to command or report the map view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition {
    /// Center of the view
    pub target: Point,
    /// Scale in metres per pixel
    pub zoom: f64,
}

impl CameraPosition {
    /// Creates a camera position. Geodetic targets are converted to the grid.
    pub fn new(target: Point, zoom: f64) -> Self {
        Self {
            target: target.to_grid(),
            zoom,
        }
    }
}

/// Rectangle in screen pixels, y growing downwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ScreenRect {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// A frame's projection: a scroll snapshot plus the screen size in pixels.
///
/// Grid northings grow upwards while screen rows grow downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub position: ScrollPosition,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(position: ScrollPosition, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
        }
    }

    pub fn metres_per_pixel(&self) -> f64 {
        self.position.metres_per_pixel
    }

    /// Grid area covered by the screen, clipped to the grid extent
    pub fn visible_bounds(&self) -> BoundingBox {
        let mpp = self.position.metres_per_pixel;
        BoundingBox::from_center_size(
            self.position.x,
            self.position.y,
            self.width * mpp,
            self.height * mpp,
        )
        .clip_to_grid_bounds()
    }

    /// Screen pixel of a point (converted to the grid first)
    pub fn grid_to_screen(&self, point: &Point) -> (f64, f64) {
        let grid = point.to_grid();
        let mpp = self.position.metres_per_pixel;
        (
            (grid.x() - self.position.x) / mpp + self.width / 2.0,
            self.height / 2.0 - (grid.y() - self.position.y) / mpp,
        )
    }

    /// Grid point under a screen pixel
    pub fn screen_to_grid(&self, sx: f64, sy: f64) -> Point {
        let mpp = self.position.metres_per_pixel;
        Point::grid(
            self.position.x + (sx - self.width / 2.0) * mpp,
            self.position.y - (sy - self.height / 2.0) * mpp,
        )
    }

    /// Screen rectangle covered by a grid box
    pub fn bounds_to_screen(&self, bounds: &BoundingBox) -> ScreenRect {
        let mpp = self.position.metres_per_pixel;
        ScreenRect {
            left: (bounds.min_x - self.position.x) / mpp + self.width / 2.0,
            top: self.height / 2.0 - (bounds.max_y - self.position.y) / mpp,
            right: (bounds.max_x - self.position.x) / mpp + self.width / 2.0,
            bottom: self.height / 2.0 - (bounds.min_y - self.position.y) / mpp,
        }
    }
}
