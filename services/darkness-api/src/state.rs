//! Application state for the darkness API.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;

use viirs_store::{CoordinateLookup, GeoReferenceStore, LocatorResolver, RasterStore, SourceResolver};

use crate::config::ServiceConfig;
use crate::rate_limit::RateLimiter;

/// Shared application state.
pub struct AppState {
    /// Configuration the service was started with.
    pub config: ServiceConfig,

    /// Brightness lookup over the cached datasets.
    pub lookup: CoordinateLookup,

    /// Admission control for guarded routes.
    pub rate_limiter: RateLimiter,

    /// Process start, for uptime reporting.
    pub started_at: Instant,

    /// Prometheus recorder handle, when one is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state that resolves locators against the configured resource directory.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let resolver = Arc::new(LocatorResolver::new(config.resource_dir.clone())?);
        Ok(Self::with_resolver(config, resolver))
    }

    /// Create state over an explicit source resolver.
    pub fn with_resolver(config: ServiceConfig, resolver: Arc<dyn SourceResolver>) -> Self {
        let rasters = Arc::new(RasterStore::new(config.sources.clone(), Arc::clone(&resolver)));
        let references = Arc::new(GeoReferenceStore::new(config.sources.clone(), resolver));
        let rate_limiter = RateLimiter::new(config.rate_limit);

        Self {
            config,
            lookup: CoordinateLookup::new(rasters, references),
            rate_limiter,
            started_at: Instant::now(),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn uptime_millis(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
