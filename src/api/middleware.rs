use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use metrics::Gauge;
use std::net::SocketAddr;
use std::time::Duration;

use crate::observability::LatencyTimer;

use super::routes::AppState;

pub const METRICS_PATH: &str = "/metrics";
pub const UNMATCHED_ENDPOINT: &str = "unmatched";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request bookkeeping captured on entry and consumed on exit.
#[derive(Debug)]
pub struct RequestContext {
    pub method: String,
    pub endpoint: String,
    pub remote_addr: String,
    pub request_id: String,
    timer: LatencyTimer,
}

impl RequestContext {
    /// Labels come from the matched route template, never the raw path.
    pub fn from_request(request: &Request) -> Self {
        let endpoint = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string())
            .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Self {
            method: request.method().to_string(),
            endpoint,
            remote_addr,
            request_id,
            timer: LatencyTimer::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed()
    }

    pub fn is_scrape(&self) -> bool {
        self.endpoint == METRICS_PATH
    }
}

/// Holds one unit of the in-flight gauge; released on drop, so panics and
/// cancelled futures give it back too.
pub struct InFlightGuard {
    gauge: Gauge,
}

impl InFlightGuard {
    pub fn enter(gauge: Gauge) -> Self {
        gauge.increment(1.0);
        Self { gauge }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.decrement(1.0);
    }
}

/// Wraps every request: in-flight gauge, request counter, duration
/// histogram and one `request completed` log line. Scrapes of the metrics
/// endpoint only touch the in-flight gauge.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let context = RequestContext::from_request(&request);
    let guard = InFlightGuard::enter(state.metrics.in_flight(&context.method, &context.endpoint));

    let response = next.run(request).await;

    let elapsed = context.elapsed();
    let status = response.status().as_u16();
    drop(guard);

    if context.is_scrape() {
        return response;
    }

    state
        .metrics
        .record_http_request(&context.method, &context.endpoint, status, elapsed);
    tracing::info!(
        method = %context.method,
        endpoint = %context.endpoint,
        status = status,
        duration = round_seconds(elapsed),
        remote_addr = %context.remote_addr,
        request_id = %context.request_id,
        "request completed"
    );

    response
}

fn round_seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10_000.0).round() / 10_000.0
}
