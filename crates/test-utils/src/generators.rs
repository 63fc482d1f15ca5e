//! Generators for synthetic GeoTIFF rasters.
//!
//! These generators create small, predictable grayscale GeoTIFFs so tests can
//! check that metadata and pixel values survive decoding exactly.

use std::io::Cursor;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Creates a test grid with predictable brightness values.
///
/// Each cell value is calculated as: `(col + row * 16) % 256`
///
/// # Example
///
/// ```
/// use test_utils::create_brightness_grid;
///
/// let grid = create_brightness_grid(4, 2);
/// assert_eq!(grid.len(), 8);
/// assert_eq!(grid[1], 1);  // col=1, row=0
/// assert_eq!(grid[4], 16); // col=0, row=1
/// ```
pub fn create_brightness_grid(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height) as usize);
    for row in 0..height {
        for col in 0..width {
            data.push(((col + row * 16) % 256) as u8);
        }
    }
    data
}

/// Expected value of [`create_brightness_grid`] at a pixel.
pub fn brightness_at(col: u32, row: u32) -> u8 {
    ((col + row * 16) % 256) as u8
}

/// Builder for an 8-bit grayscale GeoTIFF held in memory.
///
/// By default the raster is georeferenced with its top-left corner at (0, 0)
/// and one degree per pixel, and filled with [`create_brightness_grid`].
#[derive(Debug, Clone)]
pub struct GeoTiffBuilder {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    pixel_scale: Option<Vec<f64>>,
    tiepoint: Option<Vec<f64>>,
}

impl GeoTiffBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: create_brightness_grid(width, height),
            pixel_scale: Some(vec![1.0, 1.0, 0.0]),
            tiepoint: Some(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        }
    }

    /// Anchor the top-left pixel at a model coordinate (lon, lat).
    pub fn origin(mut self, lon: f64, lat: f64) -> Self {
        self.tiepoint = Some(vec![0.0, 0.0, 0.0, lon, lat, 0.0]);
        self
    }

    /// Degrees per pixel along each axis.
    pub fn pixel_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.pixel_scale = Some(vec![scale_x, scale_y, 0.0]);
        self
    }

    /// Write an arbitrary ModelPixelScaleTag payload.
    pub fn raw_pixel_scale(mut self, values: Vec<f64>) -> Self {
        self.pixel_scale = Some(values);
        self
    }

    /// Write an arbitrary ModelTiepointTag payload.
    pub fn raw_tiepoint(mut self, values: Vec<f64>) -> Self {
        self.tiepoint = Some(values);
        self
    }

    pub fn without_pixel_scale(mut self) -> Self {
        self.pixel_scale = None;
        self
    }

    pub fn without_tiepoint(mut self) -> Self {
        self.tiepoint = None;
        self
    }

    /// Fill every pixel with the same value.
    pub fn fill(mut self, value: u8) -> Self {
        self.pixels = vec![value; (self.width * self.height) as usize];
        self
    }

    /// Set a single pixel.
    pub fn pixel(mut self, col: u32, row: u32, value: u8) -> Self {
        let index = (row * self.width + col) as usize;
        self.pixels[index] = value;
        self
    }

    /// Encode the raster as TIFF bytes.
    ///
    /// Panics if encoding fails; it only runs in tests.
    pub fn build(&self) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).expect("Failed to create TIFF encoder");
            let mut image = encoder
                .new_image::<colortype::Gray8>(self.width, self.height)
                .expect("Failed to start TIFF image");

            if let Some(scale) = &self.pixel_scale {
                image
                    .encoder()
                    .write_tag(Tag::ModelPixelScaleTag, scale.as_slice())
                    .expect("Failed to write ModelPixelScaleTag");
            }
            if let Some(tiepoint) = &self.tiepoint {
                image
                    .encoder()
                    .write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())
                    .expect("Failed to write ModelTiepointTag");
            }

            image
                .write_data(&self.pixels)
                .expect("Failed to write TIFF pixel data");
        }
        cursor.into_inner()
    }
}

#[derive(Debug, Clone)]
enum RawValue {
    Short(u16),
    Long(u32),
    Doubles(Vec<f64>),
}

/// Hand-assembled single-IFD TIFF holding only the tags it is given.
///
/// No baseline image tags are written unless added explicitly, so it can
/// produce files that a full TIFF decoder rejects.
#[derive(Debug, Clone, Default)]
pub struct RawTiffBuilder {
    big_endian: bool,
    entries: Vec<(u16, RawValue)>,
}

impl RawTiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use Motorola (`MM`) byte order instead of Intel (`II`).
    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn short(mut self, tag: u16, value: u16) -> Self {
        self.entries.push((tag, RawValue::Short(value)));
        self
    }

    pub fn long(mut self, tag: u16, value: u32) -> Self {
        self.entries.push((tag, RawValue::Long(value)));
        self
    }

    pub fn doubles(mut self, tag: u16, values: Vec<f64>) -> Self {
        self.entries.push((tag, RawValue::Doubles(values)));
        self
    }

    /// Lay out header, IFD and out-of-line DOUBLE data in that order.
    pub fn build(&self) -> Vec<u8> {
        let be = self.big_endian;
        let u16_bytes = move |v: u16| if be { v.to_be_bytes() } else { v.to_le_bytes() };
        let u32_bytes = move |v: u32| if be { v.to_be_bytes() } else { v.to_le_bytes() };
        let f64_bytes = move |v: f64| if be { v.to_be_bytes() } else { v.to_le_bytes() };

        let mut entries = self.entries.clone();
        entries.sort_by_key(|(tag, _)| *tag);
        let data_start = 8 + 2 + entries.len() * 12 + 4;

        let mut out = Vec::new();
        out.extend_from_slice(if be { b"MM" } else { b"II" });
        out.extend_from_slice(&u16_bytes(42));
        out.extend_from_slice(&u32_bytes(8));
        out.extend_from_slice(&u16_bytes(entries.len() as u16));

        let mut data = Vec::new();
        for (tag, value) in &entries {
            out.extend_from_slice(&u16_bytes(*tag));
            match value {
                RawValue::Short(v) => {
                    out.extend_from_slice(&u16_bytes(3));
                    out.extend_from_slice(&u32_bytes(1));
                    out.extend_from_slice(&u16_bytes(*v));
                    out.extend_from_slice(&[0, 0]);
                }
                RawValue::Long(v) => {
                    out.extend_from_slice(&u16_bytes(4));
                    out.extend_from_slice(&u32_bytes(1));
                    out.extend_from_slice(&u32_bytes(*v));
                }
                RawValue::Doubles(values) => {
                    out.extend_from_slice(&u16_bytes(12));
                    out.extend_from_slice(&u32_bytes(values.len() as u32));
                    out.extend_from_slice(&u32_bytes((data_start + data.len()) as u32));
                    for v in values {
                        data.extend_from_slice(&f64_bytes(*v));
                    }
                }
            }
        }
        out.extend_from_slice(&u32_bytes(0));
        out.extend_from_slice(&data);
        out
    }
}
