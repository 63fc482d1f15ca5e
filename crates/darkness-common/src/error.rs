//! Error types for the darkness services.

use std::sync::Arc;

use thiserror::Error;

/// Result type alias using LightPollutionError.
pub type LightPollutionResult<T> = Result<T, LightPollutionError>;

/// Primary error type for dataset loading, lookups and admission control.
///
/// The type is `Clone` so a single failed dataset load can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum LightPollutionError {
    // === Source Errors ===
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("IO error opening stream for: {locator}")]
    Io {
        locator: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Failed to decode TIFF data: {0}")]
    Decode(String),

    #[error("Failed to read TIFF file for dataset '{key}'")]
    TiffLoad {
        key: String,
        #[source]
        source: Box<LightPollutionError>,
    },

    // === Metadata Errors ===
    #[error("Missing TIFF field: {field} (dataset '{key}')")]
    MissingMetadataField { key: String, field: &'static str },

    #[error("Invalid TIFF field {field}: {message} (dataset '{key}')")]
    InvalidMetadataField {
        key: String,
        field: &'static str,
        message: String,
    },

    // === Lookup Errors ===
    #[error("Coordinates lat:{lat:.8}, lon:{lon:.8} are outside the TIFF raster range")]
    OutOfBounds { lat: f64, lon: f64 },

    #[error("Dataset not loaded: {0}")]
    DatasetNotLoaded(String),

    // === Admission Errors ===
    #[error("Too many requests")]
    RateLimitExceeded,

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl LightPollutionError {
    /// Build an `Io` error for a locator.
    pub fn io(locator: impl Into<String>, source: std::io::Error) -> Self {
        LightPollutionError::Io {
            locator: locator.into(),
            source: Arc::new(source),
        }
    }

    /// Wrap a source-level failure with the dataset key it was loading.
    pub fn tiff_load(key: impl Into<String>, source: LightPollutionError) -> Self {
        LightPollutionError::TiffLoad {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            LightPollutionError::OutOfBounds { .. } => 400,
            LightPollutionError::RateLimitExceeded => 429,
            _ => 500,
        }
    }

    /// Short reason phrase used in the `error` field of API error bodies.
    pub fn error_label(&self) -> &'static str {
        match self {
            LightPollutionError::OutOfBounds { .. } => "Coordinates outside raster bounds",
            LightPollutionError::RateLimitExceeded => "Too Many Requests",
            _ => "Internal Server Error",
        }
    }

    /// True for failures of the underlying source (missing resource, I/O or
    /// undecodable bytes), as opposed to bad georeferencing metadata.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            LightPollutionError::ResourceNotFound(_)
                | LightPollutionError::Io { .. }
                | LightPollutionError::Decode(_)
                | LightPollutionError::TiffLoad { .. }
        )
    }
}
