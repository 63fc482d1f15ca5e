//! Common types shared by the darkness crates and services.

pub mod dataset;
pub mod error;
pub mod geo_reference;

pub use dataset::{DatasetKind, DatasetSources, DEFAULT_DATASET_KEY};
pub use error::{LightPollutionError, LightPollutionResult};
pub use geo_reference::{GeoReference, PixelPosition};
