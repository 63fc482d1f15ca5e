//! Fixed-window request admission per client and operation.
//!
//! Each key (`<client ip>:<operation>`) owns a window that starts at its
//! first request. Within the window at most `max_requests` calls are
//! admitted; once `duration` has elapsed the next call opens a new window.
//! Windows are mutated under the map's shard guard for their key, so keys
//! never contend on a global lock.
//!
//! Windows are kept for the life of the process; `tracked_keys` reports how
//! many exist.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Extension, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use metrics::counter;
use tracing::warn;

use darkness_common::{LightPollutionError, LightPollutionResult};

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Effective limits for one guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub duration: Duration,
}

impl From<RateLimitConfig> for RateLimitPolicy {
    fn from(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.requests,
            duration: Duration::from_secs(config.duration_seconds),
        }
    }
}

/// Per-operation override of the default limits.
///
/// `None` fields fall back to the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitOverride {
    pub requests: Option<u32>,
    pub duration_seconds: Option<u64>,
}

impl RateLimitOverride {
    /// Build an override from raw values where a negative number means
    /// "use the default".
    pub fn from_raw(requests: i64, duration_seconds: i64) -> Self {
        Self {
            requests: u32::try_from(requests).ok(),
            duration_seconds: u64::try_from(duration_seconds).ok(),
        }
    }

    pub fn resolve(&self, defaults: RateLimitPolicy) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests: self.requests.unwrap_or(defaults.max_requests),
            duration: self
                .duration_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.duration),
        }
    }
}

/// An operation guarded by the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardedOperation {
    pub name: &'static str,
    pub limits: RateLimitOverride,
}

impl GuardedOperation {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            limits: RateLimitOverride {
                requests: None,
                duration_seconds: None,
            },
        }
    }

    pub fn with_limits(mut self, limits: RateLimitOverride) -> Self {
        self.limits = limits;
        self
    }

    /// The brightness lookup endpoint.
    pub const fn darkness() -> Self {
        Self::new("darkness")
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
    policy: RateLimitPolicy,
}

/// Admission control keyed by client identity and operation.
#[derive(Debug)]
pub struct RateLimiter {
    defaults: RateLimitPolicy,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(defaults: impl Into<RateLimitPolicy>) -> Self {
        Self {
            defaults: defaults.into(),
            windows: DashMap::new(),
        }
    }

    pub fn defaults(&self) -> RateLimitPolicy {
        self.defaults
    }

    /// Limits in effect for `operation`.
    pub fn policy_for(&self, operation: &GuardedOperation) -> RateLimitPolicy {
        operation.limits.resolve(self.defaults)
    }

    /// Record a request for `key` and report whether it is admitted.
    ///
    /// `policy` is fixed when the key's window is first created; later calls
    /// for the same key keep the original limits.
    pub fn grant_access(&self, key: &str, policy: RateLimitPolicy) -> bool {
        self.grant_access_at(key, policy, Instant::now())
    }

    /// [`grant_access`](Self::grant_access) with an explicit clock reading.
    pub fn grant_access_at(&self, key: &str, policy: RateLimitPolicy, now: Instant) -> bool {
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
            policy,
        });

        if now.saturating_duration_since(window.started) >= window.policy.duration {
            window.count = 0;
            window.started = now;
        }

        if window.count < window.policy.max_requests {
            window.count += 1;
            true
        } else {
            false
        }
    }

    /// Admit or reject a call to `operation` from `client`.
    pub fn check(&self, client: &str, operation: &GuardedOperation) -> LightPollutionResult<()> {
        let key = format!("{}:{}", client, operation.name);
        if self.grant_access(&key, self.policy_for(operation)) {
            Ok(())
        } else {
            warn!(client = %client, operation = operation.name, "Rate limit exceeded");
            counter!("darkness_rate_limited_total", "operation" => operation.name).increment(1);
            Err(LightPollutionError::RateLimitExceeded)
        }
    }

    /// Forget every window.
    pub fn reset_all(&self) {
        self.windows.clear();
    }

    /// Number of keys with a window.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Middleware admitting requests to a guarded route.
///
/// Attach with `route_layer(middleware::from_fn_with_state(operation, enforce))`
/// so only matched routes count against the limit.
pub async fn enforce(
    State(operation): State<GuardedOperation>,
    Extension(state): Extension<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match state.rate_limiter.check(&client, &operation) {
        Ok(()) => next.run(request).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}
