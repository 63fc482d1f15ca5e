//! Dataset access for the darkness service.
//!
//! Provides:
//! - Locator resolution for bundled, local and remote GeoTIFF sources
//! - A single-flight, load-once cache per dataset key
//! - Stores for the georeferencing frame and the decoded raster
//! - Coordinate to brightness lookup over both stores

pub mod cache;
pub mod geo_reference_store;
mod ifd;
pub mod lookup;
pub mod raster_store;
pub mod source;
pub mod store;

pub use cache::{DatasetCache, DatasetCacheStats, LoadOutcome};
pub use geo_reference_store::{extract_geo_reference, GeoReferenceStore};
pub use lookup::CoordinateLookup;
pub use raster_store::{red, Raster, RasterStore};
pub use source::{Locator, LocatorResolver, SourceResolver};
pub use store::{DatasetStore, DecodeFn};
