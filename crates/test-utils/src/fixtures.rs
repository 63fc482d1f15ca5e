//! Common test fixtures for darkness tests.
//!
//! This module provides pre-defined reference frames and helpers for putting
//! generated rasters where a `SourceResolver` can find them.

use std::path::{Path, PathBuf};

use crate::generators::GeoTiffBuilder;

/// Reference frames as `(origin_x, origin_y, scale_x, scale_y, width, height)`.
pub mod frames {
    /// 50x50 one-degree raster anchored at lon 10, lat 20
    pub const OFFSET_50X50: (f64, f64, f64, f64, u32, u32) = (10.0, 20.0, 1.0, 1.0, 50, 50);

    /// 5x5 one-degree raster anchored at the null island
    pub const UNIT_5X5: (f64, f64, f64, f64, u32, u32) = (0.0, 0.0, 1.0, 1.0, 5, 5);
}

/// Builder preconfigured for one of the [`frames`] (pixel data left at the
/// default gradient).
pub fn builder_for_frame(frame: (f64, f64, f64, f64, u32, u32)) -> GeoTiffBuilder {
    let (origin_x, origin_y, scale_x, scale_y, width, height) = frame;
    GeoTiffBuilder::new(width, height)
        .origin(origin_x, origin_y)
        .pixel_scale(scale_x, scale_y)
}

/// Write TIFF bytes into `dir/name`, creating parent directories.
pub fn write_tiff(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    std::fs::write(&path, bytes).expect("Failed to write fixture TIFF");
    path
}

/// `file://` locator for a path on disk.
pub fn file_locator(path: &Path) -> String {
    format!("file://{}", path.display())
}
