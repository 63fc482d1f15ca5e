//! Brightness lookup handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `/darkness`.
///
/// Kept as raw strings so missing and unparsable values produce distinct
/// errors.
#[derive(Debug, Default, Deserialize)]
pub struct DarknessParams {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DarknessResponse {
    pub latitude: f64,
    pub longitude: f64,
    /// Red channel at the location, 0 (dark) to 255 (bright).
    pub relative_brightness: Option<f64>,
}

/// Validated coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl DarknessParams {
    /// Collect the coordinate parameters from raw query pairs.
    ///
    /// A coordinate given more than once has no single value and is
    /// rejected as invalid. Unrecognised parameters are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ApiError> {
        let mut params = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "latitude" => &mut params.latitude,
                "longitude" => &mut params.longitude,
                _ => continue,
            };
            if slot.replace(value).is_some() {
                return Err(ApiError::invalid_parameter(&name));
            }
        }
        Ok(params)
    }

    /// Parse and range-check both coordinates.
    pub fn validate(&self) -> Result<Coordinates, ApiError> {
        let latitude = parse_param("latitude", self.latitude.as_deref())?;
        let longitude = parse_param("longitude", self.longitude.as_deref())?;

        let violations: Vec<String> = [
            check_range("latitude", latitude, -90.0, 90.0),
            check_range("longitude", longitude, -180.0, 180.0),
        ]
        .into_iter()
        .flatten()
        .collect();

        if !violations.is_empty() {
            return Err(ApiError::constraint_violations(&violations));
        }

        Ok(Coordinates {
            latitude,
            longitude,
        })
    }
}

fn parse_param(name: &str, raw: Option<&str>) -> Result<f64, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::missing_parameter(name))?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ApiError::invalid_parameter(name)),
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Option<String> {
    if value < min {
        Some(format!("{}: must be greater than or equal to {}", name, min))
    } else if value > max {
        Some(format!("{}: must be less than or equal to {}", name, max))
    } else {
        None
    }
}

/// GET /darkness
pub async fn darkness_handler(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<DarknessResponse>, ApiError> {
    let Query(pairs) = query
        .map_err(|rejection| ApiError::new(StatusCode::BAD_REQUEST, "Bad Request", rejection.body_text()))?;
    let coords = DarknessParams::from_pairs(pairs)?.validate()?;
    debug!(lat = coords.latitude, lon = coords.longitude, "Darkness query");

    let value = state.lookup.value(coords.latitude, coords.longitude)?;

    Ok(Json(DarknessResponse {
        latitude: coords.latitude,
        longitude: coords.longitude,
        relative_brightness: Some(f64::from(value)),
    }))
}
