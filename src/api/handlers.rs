use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::responses::{AlertAck, Exposition, RawJson};
use super::routes::AppState;
use crate::error::{AppError, Result};
use crate::models::{parse_alert_webhook, BookedConsultation, ConsultationList};
use crate::services::{simulate_latency, BookingRequest, PaymentReceipt};

/// Logs genuine faults with their detail before they become a generic 500.
fn log_fault(operation: &'static str) -> impl FnOnce(AppError) -> AppError {
    move |err| {
        if err.status_code() == StatusCode::INTERNAL_SERVER_ERROR && !err.is_simulated() {
            tracing::error!(operation = operation, error = %err, "request failed");
        }
        err
    }
}

/// Health check endpoint. 503 only when the store probe fails.
pub async fn health(State(state): State<AppState>) -> Response {
    let report = state.health.check_all().await;
    let status = if report.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(report)).into_response()
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Exposition {
    Exposition(state.metrics.render())
}

/// Available doctors, served through the cache.
pub async fn list_doctors(State(state): State<AppState>) -> Result<RawJson> {
    simulate_latency(state.random.as_ref(), state.simulation.doctors_latency).await;

    let payload = state
        .doctors
        .list_available()
        .await
        .map_err(log_fault("list_doctors"))?;

    Ok(RawJson(payload))
}

pub async fn list_consultations(State(state): State<AppState>) -> Result<Json<ConsultationList>> {
    simulate_latency(state.random.as_ref(), state.simulation.consultations_latency).await;

    let consultations = state
        .consultations
        .list_recent()
        .await
        .map_err(log_fault("list_consultations"))?;

    Ok(Json(consultations))
}

/// Books a consultation. The body is optional and parsed leniently.
pub async fn book_consultation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<BookedConsultation>)> {
    simulate_latency(state.random.as_ref(), state.simulation.consultations_latency).await;

    let request = BookingRequest::from_body(&body);
    let booked = state
        .consultations
        .book(request)
        .await
        .map_err(log_fault("book_consultation"))?;

    Ok((StatusCode::CREATED, Json(booked)))
}

pub async fn process_payment(State(state): State<AppState>) -> Result<Json<PaymentReceipt>> {
    let receipt = state
        .payments
        .process()
        .await
        .map_err(log_fault("process_payment"))?;

    Ok(Json(receipt))
}

/// Alertmanager receiver. Logs each alert and never fails.
pub async fn alert_webhook(body: Bytes) -> Json<AlertAck> {
    let alerts = parse_alert_webhook(&body);

    for alert in &alerts {
        tracing::warn!(
            alertname = %alert.alertname,
            severity = %alert.severity,
            status = %alert.status,
            starts_at = alert.starts_at.as_deref(),
            description = %alert.description,
            "ALERT RECEIVED"
        );
    }

    Json(AlertAck::received(alerts.len()))
}
