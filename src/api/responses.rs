use axum::{
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Acknowledgement returned to the alert webhook sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertAck {
    pub status: String,
    pub alert_count: usize,
}

impl AlertAck {
    pub fn received(alert_count: usize) -> Self {
        Self {
            status: "received".to_string(),
            alert_count,
        }
    }
}

/// A body that is already serialized JSON, sent byte for byte.
#[derive(Debug, Clone)]
pub struct RawJson(pub String);

impl IntoResponse for RawJson {
    fn into_response(self) -> Response {
        ([(CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}

/// Text exposition of the metrics registry.
#[derive(Debug, Clone)]
pub struct Exposition(pub String);

impl IntoResponse for Exposition {
    fn into_response(self) -> Response {
        ([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], self.0).into_response()
    }
}
