//! Decoded pixel grids and the store that caches them.

use std::sync::Arc;

use image::{ImageError, ImageFormat};

use darkness_common::{DatasetSources, LightPollutionError, LightPollutionResult};

use crate::source::SourceResolver;
use crate::store::DatasetStore;

/// Row-major grid of packed 32-bit ARGB pixels.
///
/// Only the red channel carries meaning for the VIIRS composites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

/// Red channel of a packed ARGB pixel.
#[inline]
pub fn red(argb: u32) -> u8 {
    ((argb >> 16) & 0xff) as u8
}

/// Pack RGBA channels into a single ARGB value.
#[inline]
pub fn pack_argb([r, g, b, a]: [u8; 4]) -> u32 {
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

impl Raster {
    /// Build a raster from already packed pixels.
    ///
    /// Fails when `pixels.len()` does not equal `width * height`.
    pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> LightPollutionResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(LightPollutionError::Decode(format!(
                "raster {}x{} needs {} pixels, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode TIFF bytes into a raster.
    ///
    /// Any sample layout the `image` crate understands is normalized to RGBA8
    /// first, so grayscale sources end up with equal R, G and B.
    pub fn decode(key: &str, bytes: &[u8]) -> LightPollutionResult<Self> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Tiff)
            .map_err(|e| LightPollutionError::tiff_load(key, image_error(e)))?
            .to_rgba8();

        let (width, height) = image.dimensions();
        let pixels = image.pixels().map(|p| pack_argb(p.0)).collect();
        Self::from_argb(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed pixel at `(x, y)`, or `None` outside the grid.
    pub fn argb(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Approximate heap size of the pixel buffer.
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<u32>()
    }
}

fn image_error(err: ImageError) -> LightPollutionError {
    match err {
        ImageError::IoError(e) => LightPollutionError::io("tiff stream", e),
        other => LightPollutionError::Decode(other.to_string()),
    }
}

/// Store of decoded [`Raster`]s, one per dataset key.
pub type RasterStore = DatasetStore<Raster>;

impl DatasetStore<Raster> {
    pub fn new(sources: DatasetSources, resolver: Arc<dyn SourceResolver>) -> Self {
        Self::with_decoder("raster", sources, resolver, Raster::decode)
    }
}
