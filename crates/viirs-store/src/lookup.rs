//! Coordinate to brightness lookup over the cached datasets.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use darkness_common::{GeoReference, LightPollutionError, LightPollutionResult, DEFAULT_DATASET_KEY};

use crate::geo_reference_store::GeoReferenceStore;
use crate::raster_store::{red, Raster, RasterStore};

/// Answers brightness queries from a raster and its reference frame.
pub struct CoordinateLookup {
    rasters: Arc<RasterStore>,
    references: Arc<GeoReferenceStore>,
}

impl CoordinateLookup {
    pub fn new(rasters: Arc<RasterStore>, references: Arc<GeoReferenceStore>) -> Self {
        Self {
            rasters,
            references,
        }
    }

    /// Eagerly load the default dataset into both stores.
    pub async fn warm_up(&self) -> LightPollutionResult<()> {
        info!(key = DEFAULT_DATASET_KEY, "Warming up dataset caches");
        self.load(DEFAULT_DATASET_KEY).await?;
        Ok(())
    }

    /// Load `key` into both stores, raster first.
    ///
    /// Returns `false` when the key routes to no configured dataset.
    pub async fn load(&self, key: &str) -> LightPollutionResult<bool> {
        let raster = self.rasters.get_or_load(key).await?;
        let reference = self.references.get_or_load(key).await?;
        Ok(!(raster.is_unknown() || reference.is_unknown()))
    }

    /// Brightness at a coordinate of the default dataset.
    pub fn value(&self, lat: f64, lon: f64) -> LightPollutionResult<u8> {
        self.value_in(DEFAULT_DATASET_KEY, lat, lon)
    }

    /// Brightness at a coordinate of an already loaded dataset.
    pub fn value_in(&self, key: &str, lat: f64, lon: f64) -> LightPollutionResult<u8> {
        counter!("darkness_lookups_total").increment(1);
        let (Some(raster), Some(reference)) = (self.rasters.get(key), self.references.get(key))
        else {
            return Err(LightPollutionError::DatasetNotLoaded(key.to_string()));
        };
        Self::value_with(lat, lon, &raster, &reference)
    }

    /// Brightness at a coordinate for an explicit raster and frame.
    pub fn value_with(
        lat: f64,
        lon: f64,
        raster: &Raster,
        reference: &GeoReference,
    ) -> LightPollutionResult<u8> {
        let pixel = reference.lat_lon_to_pixel(lat, lon);
        debug!(lat, lon, x = pixel.x, y = pixel.y, "Pixel position");

        if !reference.contains_pixel(pixel) {
            warn!(lat, lon, x = pixel.x, y = pixel.y, "Coordinates outside raster range");
            return Err(LightPollutionError::OutOfBounds { lat, lon });
        }

        // The frame and raster normally agree on size; a smaller raster is
        // treated like any other out-of-range lookup.
        raster
            .argb(pixel.x as u32, pixel.y as u32)
            .map(red)
            .ok_or(LightPollutionError::OutOfBounds { lat, lon })
    }

    /// Whether the default dataset is cached in both stores.
    pub fn is_ready(&self) -> bool {
        self.is_loaded(DEFAULT_DATASET_KEY)
    }

    pub fn is_loaded(&self, key: &str) -> bool {
        self.rasters.get(key).is_some() && self.references.get(key).is_some()
    }

    /// Keys cached in both stores.
    pub fn loaded_keys(&self) -> Vec<String> {
        self.rasters
            .cached_keys()
            .into_iter()
            .filter(|key| self.references.get(key).is_some())
            .collect()
    }

    pub fn rasters(&self) -> &RasterStore {
        &self.rasters
    }

    pub fn references(&self) -> &GeoReferenceStore {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster_store::pack_argb;

    fn gradient(width: u32, height: u32) -> Raster {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| pack_argb([(x + y * 10) as u8, 0, 0, 255])))
            .collect();
        Raster::from_argb(width, height, pixels).unwrap()
    }

    #[test]
    fn test_value_in_bounds() {
        let raster = gradient(50, 50);
        let reference = GeoReference::new(10.0, 20.0, 1.0, 1.0, 50, 50);

        // x = trunc(15.5 - 10) = 5, y = trunc(20 - 15.5) = 4
        let value = CoordinateLookup::value_with(15.5, 15.5, &raster, &reference).unwrap();
        assert_eq!(value, 45);
    }

    #[test]
    fn test_offset_frame_reads_red_channel() {
        let mut pixels = vec![pack_argb([0, 0, 0, 255]); 50 * 50];
        pixels[10 * 50 + 15] = pack_argb([123, 7, 9, 255]);
        let raster = Raster::from_argb(50, 50, pixels).unwrap();
        let reference = GeoReference::new(10.0, 20.0, 1.0, 1.0, 50, 50);

        assert_eq!(CoordinateLookup::value_with(10.0, 25.0, &raster, &reference).unwrap(), 123);
    }

    #[test]
    fn test_out_of_bounds_message_has_coordinates() {
        let raster = gradient(5, 5);
        let reference = GeoReference::new(0.0, 0.0, 1.0, 1.0, 5, 5);

        let err = CoordinateLookup::value_with(7.0, 6.0, &raster, &reference).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("lat:7.00000000"));
        assert!(message.contains("lon:6.00000000"));
    }

    #[test]
    fn test_value_at_origin() {
        let raster = gradient(5, 5);
        let reference = GeoReference::new(0.0, 0.0, 1.0, 1.0, 5, 5);

        assert_eq!(CoordinateLookup::value_with(0.0, 0.0, &raster, &reference).unwrap(), 0);
        assert_eq!(CoordinateLookup::value_with(-4.5, 4.5, &raster, &reference).unwrap(), 44);
    }

    #[test]
    fn test_value_out_of_bounds() {
        let raster = gradient(5, 5);
        let reference = GeoReference::new(0.0, 0.0, 1.0, 1.0, 5, 5);

        let err = CoordinateLookup::value_with(-10.0, 10.0, &raster, &reference).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Coordinates lat:-10.00000000, lon:10.00000000 are outside the TIFF raster range"
        );
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_truncation_keeps_small_negative_offsets_in_range() {
        let raster = gradient(5, 5);
        let reference = GeoReference::new(0.0, 0.0, 1.0, 1.0, 5, 5);

        // lon -0.5 truncates to column 0 instead of flooring to -1.
        assert_eq!(CoordinateLookup::value_with(-1.0, -0.5, &raster, &reference).unwrap(), 10);
    }

    #[test]
    fn test_raster_smaller_than_frame() {
        let raster = gradient(2, 2);
        let reference = GeoReference::new(0.0, 0.0, 1.0, 1.0, 5, 5);

        let err = CoordinateLookup::value_with(-3.0, 3.0, &raster, &reference).unwrap_err();
        assert!(matches!(err, LightPollutionError::OutOfBounds { .. }));
    }
}
