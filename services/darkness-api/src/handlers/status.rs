//! Service status handler.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use darkness_common::GeoReference;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub uptime_millis: u64,
    pub timestamp: String,
    pub rate_limit: RateLimitStatus,
    pub tracked_clients: usize,
    pub datasets: Vec<DatasetStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub requests: u32,
    pub duration_seconds: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatus {
    pub key: String,
    pub geo_reference: Option<GeoReference>,
}

/// GET /status
pub async fn status_handler(Extension(state): Extension<Arc<AppState>>) -> Json<StatusResponse> {
    let datasets = state
        .lookup
        .loaded_keys()
        .into_iter()
        .map(|key| DatasetStatus {
            geo_reference: state.lookup.references().get(&key).map(|r| *r),
            key,
        })
        .collect();

    Json(StatusResponse {
        status: "UP".to_string(),
        uptime_millis: state.uptime_millis(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        rate_limit: RateLimitStatus {
            requests: state.config.rate_limit.requests,
            duration_seconds: state.config.rate_limit.duration_seconds,
        },
        tracked_clients: state.rate_limiter.tracked_keys(),
        datasets,
    })
}
