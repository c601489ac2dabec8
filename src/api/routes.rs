use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
};

use super::{handlers, middleware::track_requests};
use crate::config::{CacheSettings, SimulationSettings};
use crate::observability::{AppMetrics, HealthChecker};
use crate::services::{
    ConnectionProvider, ConsultationService, DoctorService, PaymentService, RandomSource,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<AppMetrics>,
    pub random: Arc<dyn RandomSource>,
    pub simulation: SimulationSettings,
    pub doctors: Arc<DoctorService>,
    pub consultations: Arc<ConsultationService>,
    pub payments: Arc<PaymentService>,
    pub health: Arc<HealthChecker>,
}

impl AppState {
    pub fn new(
        connections: ConnectionProvider,
        random: Arc<dyn RandomSource>,
        cache: CacheSettings,
        simulation: SimulationSettings,
    ) -> Self {
        let metrics = connections.metrics().clone();
        let payments = PaymentService::new(
            metrics.clone(),
            random.clone(),
            simulation.payment_failure_rate,
            simulation.payment_latency,
        );

        Self {
            metrics,
            doctors: Arc::new(DoctorService::new(connections.clone(), cache)),
            consultations: Arc::new(ConsultationService::new(connections.clone(), random.clone())),
            payments: Arc::new(payments),
            health: Arc::new(HealthChecker::new(connections)),
            random,
            simulation,
        }
    }
}

/// Creates the main API router with all routes and the request pipeline.
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        // Operational endpoints
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Business endpoints
        .route("/api/doctors", get(handlers::list_doctors))
        .route(
            "/api/consultations",
            get(handlers::list_consultations).post(handlers::book_consultation),
        )
        .route(
            "/api/payment",
            get(handlers::process_payment).post(handlers::process_payment),
        )
        // Alertmanager receiver
        .route("/api/webhook/alert", post(handlers::alert_webhook))
        .with_state(state.clone());

    instrument(routes, state)
}

/// Wraps a router in the request pipeline. Layers added later run first:
/// request id assignment, then id propagation, then instrumentation, then
/// panic recovery, so a panicking handler is still counted as a 500.
pub fn instrument(router: Router, state: AppState) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(state, track_requests))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(error = %detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
