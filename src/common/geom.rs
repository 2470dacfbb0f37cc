//! Opaque geographic value types.
//!
//! The decoders treat coordinates and bounding rectangles as plain value
//! types in projected map space; nothing here depends on a particular
//! mapping toolkit, so callers can convert to their own geometry library.

/// A geographic coordinate pair.
///
/// The shapefile stream stores vertices as `(x, y)` doubles; the decoder
/// maps `x` to longitude and `y` to latitude.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }
}

/// An axis-aligned rectangle in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapRect {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl MapRect {
    pub fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        MapRect {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// Build a rectangle from the `x_min/y_min/x_max/y_max` extents stored
    /// in shapefile headers and record bounding boxes.
    pub fn from_extents(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        MapRect {
            origin_x: x_min,
            origin_y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
        }
    }

    /// Zero-area rectangle anchored at a single coordinate, used for the
    /// scalar point shape variants.
    pub fn at_coordinate(coordinate: Coordinate) -> Self {
        MapRect {
            origin_x: coordinate.longitude,
            origin_y: coordinate.latitude,
            width: 0.0,
            height: 0.0,
        }
    }

    /// Whether the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}
