//! Fixed-window rate limiting middleware.
//!
//! Bounds load on the shared ledger connection: each client gets
//! `max_requests` per window across all `/api` routes, counted in a
//! per-client window that resets when it expires. Excess requests get a
//! 429 with a `Retry-After` hint.

use crate::config::RateLimitConfig;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::Response,
};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::warn;

/// A client's current window.
struct Window {
    started: Instant,
    count: u32,
}

/// Rate limiter state shared across requests.
pub struct RateLimitState {
    windows: DashMap<IpAddr, Window>,
    config: RateLimitConfig,
}

impl RateLimitState {
    /// Creates limiter state for the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    /// Counts a request against the client's window. On excess, returns
    /// how long until the window resets.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let mut window = self.windows.entry(ip).or_insert_with(|| Window {
            started: Instant::now(),
            count: 0,
        });

        let elapsed = window.started.elapsed();
        if elapsed >= self.config.window {
            window.started = Instant::now();
            window.count = 0;
        }

        window.count += 1;
        if window.count > self.config.max_requests {
            Err(self.config.window.saturating_sub(window.started.elapsed()))
        } else {
            Ok(())
        }
    }

    /// Drops expired windows. Called periodically from a background task.
    pub fn cleanup(&self) {
        let window = self.config.window;
        self.windows
            .retain(|_, w| w.started.elapsed() < window);
    }

    /// Number of tracked clients.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

/// Rate limit layer.
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
}

impl RateLimitLayer {
    /// Creates the layer and its shared state.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(RateLimitState::new(config)),
        }
    }

    /// Shared state handle, for the cleanup task.
    #[must_use]
    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

/// Rate limit service.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req);
            match state.check(ip) {
                Ok(()) => inner.call(req).await,
                Err(retry_after) => {
                    warn!(ip = %ip, retry_after_secs = retry_after.as_secs(), "rate limit exceeded");
                    Ok(rate_limit_response(retry_after))
                }
            }
        })
    }
}

/// Extract client IP from request headers or connection info.
fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    // X-Forwarded-For first (proxied requests); take the original client
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            if let Ok(ip) = real_ip_str.parse::<IpAddr>() {
                return ip;
            }
        }
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}

fn rate_limit_response(retry_after: Duration) -> Response {
    let body = serde_json::json!({
        "error": "Too many requests, please try again later"
    });

    let mut response = Response::new(Body::from(
        serde_json::to_vec(&body).unwrap_or_default(),
    ));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    if let Ok(content_type) = "application/json".parse() {
        response.headers_mut().insert("Content-Type", content_type);
    }
    if let Ok(retry) = retry_after.as_secs().max(1).to_string().parse() {
        response.headers_mut().insert("Retry-After", retry);
    }
    response
}

/// Background task dropping expired windows.
pub async fn cleanup_task(state: Arc<RateLimitState>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        state.cleanup();
    }
}
