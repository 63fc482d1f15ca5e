//! GeoTIFF georeferencing extraction and the store that caches it.
//!
//! Only the tags needed for a north-up affine frame are read:
//!
//! | Tag | Code | Required | Use |
//! |---|---|---|---|
//! | ImageWidth | 256 | no (defaults to 0) | raster width |
//! | ImageLength | 257 | no (defaults to 0) | raster height |
//! | ModelPixelScaleTag | 33550 | yes | degrees per pixel (x, y) |
//! | ModelTiepointTag | 33922 | yes | origin from entries 3 and 4 |

use std::io::Cursor;
use std::sync::Arc;

use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tiff::{TiffError, TiffFormatError};
use tracing::{debug, error};

use darkness_common::{DatasetSources, GeoReference, LightPollutionError, LightPollutionResult};

use crate::ifd::Ifd;
use crate::source::SourceResolver;
use crate::store::DatasetStore;

const PIXEL_SCALE_FIELD: &str = "ModelPixelScaleTag (33550)";
const TIEPOINT_FIELD: &str = "ModelTiepointTag (33922)";

/// Store of [`GeoReference`]s, one per dataset key.
pub type GeoReferenceStore = DatasetStore<GeoReference>;

impl DatasetStore<GeoReference> {
    pub fn new(sources: DatasetSources, resolver: Arc<dyn SourceResolver>) -> Self {
        Self::with_decoder("geo_reference", sources, resolver, extract_geo_reference)
    }
}

/// Convert a TIFF decoder failure into the error taxonomy.
fn tiff_error(err: TiffError) -> LightPollutionError {
    match err {
        TiffError::IoError(e) => LightPollutionError::io("tiff stream", e),
        other => LightPollutionError::Decode(other.to_string()),
    }
}

/// Source of tag values: the full decoder, or the bare first IFD when the
/// decoder rejects the file for a missing baseline tag.
enum TagReader<'a> {
    Decoder(Decoder<Cursor<&'a [u8]>>),
    Ifd(Ifd<'a>),
}

impl<'a> TagReader<'a> {
    fn open(key: &str, bytes: &'a [u8]) -> LightPollutionResult<Self> {
        match Decoder::new(Cursor::new(bytes)) {
            Ok(decoder) => Ok(Self::Decoder(decoder)),
            Err(TiffError::FormatError(TiffFormatError::RequiredTagNotFound(tag))) => {
                debug!(key = %key, tag = ?tag, "Baseline tag missing, reading the IFD directly");
                Ifd::read_first(bytes).map(Self::Ifd).map_err(|reason| {
                    error!(key = %key, error = %reason, "Error while reading TIFF metadata");
                    LightPollutionError::tiff_load(key, LightPollutionError::Decode(reason))
                })
            }
            Err(e) => {
                error!(key = %key, error = %e, "Error while reading TIFF metadata");
                Err(LightPollutionError::tiff_load(key, tiff_error(e)))
            }
        }
    }

    fn u32_value(&mut self, tag: Tag) -> Result<Option<u32>, String> {
        match self {
            Self::Decoder(decoder) => decoder
                .find_tag(tag)
                .and_then(|value| value.map(|v| v.into_u32()).transpose())
                .map_err(|e| e.to_string()),
            Self::Ifd(ifd) => ifd.u32_value(tag.to_u16()),
        }
    }

    fn f64_values(&mut self, tag: Tag) -> Result<Option<Vec<f64>>, String> {
        match self {
            Self::Decoder(decoder) => decoder
                .find_tag(tag)
                .and_then(|value| value.map(|v| v.into_f64_vec()).transpose())
                .map_err(|e| e.to_string()),
            Self::Ifd(ifd) => ifd.f64_values(tag.to_u16()),
        }
    }
}

/// Read the georeferencing frame of a GeoTIFF held in memory.
///
/// Failures to parse the TIFF structure are reported as `TiffLoad`; missing
/// or malformed georeferencing tags keep their own kind and carry `key`.
pub fn extract_geo_reference(key: &str, bytes: &[u8]) -> LightPollutionResult<GeoReference> {
    let mut reader = TagReader::open(key, bytes)?;

    let width = optional_dimension(&mut reader, key, Tag::ImageWidth, "ImageWidth")?;
    let height = optional_dimension(&mut reader, key, Tag::ImageLength, "ImageLength")?;

    let scales = required_f64_values(&mut reader, key, Tag::ModelPixelScaleTag, PIXEL_SCALE_FIELD)?;
    if scales.len() < 2 {
        error!(key = %key, len = scales.len(), "Incorrect ModelPixelScaleTag length");
        return Err(invalid(key, PIXEL_SCALE_FIELD, "Incorrect length"));
    }
    let (pixel_scale_x, pixel_scale_y) = (scales[0], scales[1]);
    for scale in [pixel_scale_x, pixel_scale_y] {
        if !scale.is_finite() || scale <= 0.0 {
            error!(key = %key, scale, "Pixel scale must be finite and positive");
            return Err(invalid(
                key,
                PIXEL_SCALE_FIELD,
                format!("pixel scale must be finite and positive, got {}", scale),
            ));
        }
    }

    let tiepoints = required_f64_values(&mut reader, key, Tag::ModelTiepointTag, TIEPOINT_FIELD)?;
    if tiepoints.len() < 5 {
        error!(key = %key, len = tiepoints.len(), "Incorrect ModelTiepointTag length");
        return Err(invalid(key, TIEPOINT_FIELD, "Incorrect length"));
    }

    Ok(GeoReference::new(
        tiepoints[3],
        tiepoints[4],
        pixel_scale_x,
        pixel_scale_y,
        width,
        height,
    ))
}

fn optional_dimension(
    reader: &mut TagReader<'_>,
    key: &str,
    tag: Tag,
    field: &'static str,
) -> LightPollutionResult<u32> {
    reader
        .u32_value(tag)
        .map(|value| value.unwrap_or(0))
        .map_err(|e| invalid(key, field, e))
}

fn required_f64_values(
    reader: &mut TagReader<'_>,
    key: &str,
    tag: Tag,
    field: &'static str,
) -> LightPollutionResult<Vec<f64>> {
    match reader.f64_values(tag) {
        Ok(Some(values)) => Ok(values),
        Ok(None) => {
            error!(key = %key, field, "Error while reading TIFF file metadata, missing field");
            Err(LightPollutionError::MissingMetadataField {
                key: key.to_string(),
                field,
            })
        }
        Err(e) => {
            error!(key = %key, field, error = %e, "Error while reading TIFF file metadata");
            Err(invalid(key, field, e))
        }
    }
}

fn invalid(key: &str, field: &'static str, message: impl Into<String>) -> LightPollutionError {
    LightPollutionError::InvalidMetadataField {
        key: key.to_string(),
        field,
        message: message.into(),
    }
}
