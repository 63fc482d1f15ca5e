//! Geographic reference frame of a raster and its affine transform.

use serde::{Deserialize, Serialize};

/// Affine reference frame extracted from GeoTIFF metadata.
///
/// `origin_x`/`origin_y` are the model coordinates (degrees) of the tie point
/// anchored at the raster's top-left pixel. Pixel scales are degrees per
/// pixel and are never zero: every lookup divides by them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoReference {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_scale_x: f64,
    pub pixel_scale_y: f64,
    pub width: u32,
    pub height: u32,
}

/// Integer pixel position produced by [`GeoReference::lat_lon_to_pixel`].
///
/// Components are signed because coordinates west of or above the origin map
/// to negative pixel indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPosition {
    pub x: i64,
    pub y: i64,
}

impl GeoReference {
    /// Create a new reference frame.
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        pixel_scale_x: f64,
        pixel_scale_y: f64,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_scale_x,
            pixel_scale_y,
            width,
            height,
        }
    }

    /// Convert a latitude/longitude to a pixel position.
    ///
    /// Fractions are truncated toward zero, not floored, so a point slightly
    /// west of the origin lands on column 0 rather than -1.
    pub fn lat_lon_to_pixel(&self, lat: f64, lon: f64) -> PixelPosition {
        let x = ((lon - self.origin_x) / self.pixel_scale_x) as i64;
        let y = ((self.origin_y - lat) / self.pixel_scale_y) as i64;
        PixelPosition { x, y }
    }

    /// Check whether a pixel position lies inside `[0, width) x [0, height)`.
    pub fn contains_pixel(&self, pixel: PixelPosition) -> bool {
        pixel.x >= 0
            && pixel.x < i64::from(self.width)
            && pixel.y >= 0
            && pixel.y < i64::from(self.height)
    }

    /// Geographic extent covered by the raster: `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let max_lon = self.origin_x + f64::from(self.width) * self.pixel_scale_x;
        let min_lat = self.origin_y - f64::from(self.height) * self.pixel_scale_y;
        (self.origin_x, min_lat, max_lon, self.origin_y)
    }
}
