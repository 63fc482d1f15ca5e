//! End-to-end tests of the HTTP surface against generated GeoTIFFs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use darkness_api::app;
use darkness_api::config::{RateLimitConfig, ServiceConfig};
use darkness_api::state::AppState;
use test_utils::{temp_test_dir, write_tiff, GeoTiffBuilder};

/// 2x2 degree window around Warsaw at 0.01 degree resolution.
fn warsaw_tiff() -> Vec<u8> {
    GeoTiffBuilder::new(200, 200)
        .origin(20.0, 53.0)
        .pixel_scale(0.01, 0.01)
        .fill(3)
        .pixel(101, 77, 128)
        .build()
}

struct TestService {
    state: Arc<AppState>,
    _dir: TempDir,
}

impl TestService {
    async fn start(rate_limit: RateLimitConfig, warm_up: bool) -> Self {
        let dir = temp_test_dir();
        write_tiff(dir.path(), "viirs/2023/average.tif", &warsaw_tiff());
        write_tiff(dir.path(), "viirs/2023/mask.tif", &warsaw_tiff());

        let config = ServiceConfig {
            resource_dir: dir.path().to_path_buf(),
            rate_limit,
            ..ServiceConfig::default()
        };
        let state = Arc::new(AppState::new(config).unwrap());
        if warm_up {
            state.lookup.warm_up().await.unwrap();
        }

        Self { state, _dir: dir }
    }

    async fn ready() -> Self {
        Self::start(RateLimitConfig::default(), true).await
    }

    fn router(&self) -> Router {
        app::router(Arc::clone(&self.state))
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(self.router(), uri).await
    }
}

async fn send(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn assert_error(body: &Value, status: u16, error: &str, message: &str) {
    assert_eq!(body["status"], status);
    assert_eq!(body["error"], error);
    assert_eq!(body["message"], message);
    assert!(body["timestamp"].as_str().is_some_and(|t| t.ends_with('Z')));
}

#[tokio::test]
async fn test_darkness_returns_red_channel() {
    let service = TestService::ready().await;
    let (status, body) = service.get("/darkness?latitude=52.2298&longitude=21.0117").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({"latitude": 52.2298, "longitude": 21.0117, "relativeBrightness": 128.0})
    );
}

#[tokio::test]
async fn test_darkness_elsewhere_in_raster() {
    let service = TestService::ready().await;
    let (status, body) = service.get("/darkness?latitude=52.5&longitude=20.5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relativeBrightness"], 3.0);
}

#[tokio::test]
async fn test_missing_parameter() {
    let service = TestService::ready().await;
    let (status, body) = service.get("/darkness?longitude=21.0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, 400, "Bad Request", "Missing required request parameter: latitude");
}

#[tokio::test]
async fn test_invalid_parameter() {
    let service = TestService::ready().await;
    let (status, body) = service.get("/darkness?latitude=52.2&longitude=east").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, 400, "Bad Request", "Invalid parameter: longitude");
}

#[tokio::test]
async fn test_repeated_parameter_gets_json_error() {
    let service = TestService::ready().await;
    let (status, body) = service.get("/darkness?latitude=1&latitude=2&longitude=3").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, 400, "Bad Request", "Invalid parameter: latitude");
}

#[tokio::test]
async fn test_out_of_range_parameter() {
    let service = TestService::ready().await;
    let (status, body) = service.get("/darkness?latitude=95&longitude=21.0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(
        &body,
        400,
        "Invalid request parameters",
        "latitude: must be less than or equal to 90",
    );
}

#[tokio::test]
async fn test_outside_raster_bounds() {
    let service = TestService::ready().await;
    let (status, body) = service.get("/darkness?latitude=7&longitude=6").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(
        &body,
        400,
        "Coordinates outside raster bounds",
        "Coordinates lat:7.00000000, lon:6.00000000 are outside the TIFF raster range",
    );
}

#[tokio::test]
async fn test_unloaded_dataset_is_internal_error() {
    let service = TestService::start(RateLimitConfig::default(), false).await;
    let (status, body) = service.get("/darkness?latitude=52.2298&longitude=21.0117").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error(&body, 500, "Internal Server Error", "Dataset not loaded: 2023/average");
}

#[tokio::test]
async fn test_rate_limit_rejects_third_call() {
    let service = TestService::start(
        RateLimitConfig {
            requests: 2,
            duration_seconds: 60,
        },
        true,
    )
    .await;
    let uri = "/darkness?latitude=52.2298&longitude=21.0117";

    assert_eq!(service.get(uri).await.0, StatusCode::OK);
    assert_eq!(service.get(uri).await.0, StatusCode::OK);

    let (status, body) = service.get(uri).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_error(&body, 429, "Too Many Requests", "Too many requests");

    service.state.rate_limiter.reset_all();
    assert_eq!(service.get(uri).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_counts_invalid_requests() {
    let service = TestService::start(
        RateLimitConfig {
            requests: 1,
            duration_seconds: 60,
        },
        true,
    )
    .await;

    assert_eq!(service.get("/darkness").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(
        service.get("/darkness?latitude=52.2&longitude=21.0").await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_rate_limit_is_per_client() {
    let service = TestService::start(
        RateLimitConfig {
            requests: 1,
            duration_seconds: 60,
        },
        true,
    )
    .await;
    let uri = "/darkness?latitude=52.2298&longitude=21.0117";

    let first = service
        .router()
        .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 40000))));
    let second = service
        .router()
        .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 2], 40000))));

    assert_eq!(send(first.clone(), uri).await.0, StatusCode::OK);
    assert_eq!(send(first, uri).await.0, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(send(second, uri).await.0, StatusCode::OK);
    assert_eq!(service.state.rate_limiter.tracked_keys(), 2);
}

#[tokio::test]
async fn test_status_is_not_rate_limited() {
    let service = TestService::start(
        RateLimitConfig {
            requests: 1,
            duration_seconds: 30,
        },
        true,
    )
    .await;

    for _ in 0..3 {
        assert_eq!(service.get("/status").await.0, StatusCode::OK);
    }

    let (_, body) = service.get("/status").await;
    assert_eq!(body["status"], "UP");
    assert_eq!(body["rateLimit"]["requests"], 1);
    assert_eq!(body["rateLimit"]["durationSeconds"], 30);
    assert_eq!(body["trackedClients"], 0);
    assert_eq!(body["datasets"][0]["key"], "2023/average");
    assert_eq!(body["datasets"][0]["geoReference"]["width"], 200);
    assert!(body["uptimeMillis"].is_u64());
}

#[tokio::test]
async fn test_health_and_readiness() {
    let cold = TestService::start(RateLimitConfig::default(), false).await;
    let (status, body) = cold.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = cold.get("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    cold.state.lookup.warm_up().await.unwrap();
    let (status, body) = cold.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_warm_up_fails_without_resources() {
    let dir = temp_test_dir();
    let config = ServiceConfig {
        resource_dir: dir.path().to_path_buf(),
        ..ServiceConfig::default()
    };
    let state = AppState::new(config).unwrap();

    let err = state.lookup.warm_up().await.unwrap_err();
    assert!(err.is_source_failure());
    assert!(!state.lookup.is_ready());
}
