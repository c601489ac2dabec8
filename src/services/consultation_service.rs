use serde_json::Value;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{BookedConsultation, ConsultationList, NewConsultation, CONSULTATION_TYPES};
use crate::observability::AppMetrics;
use crate::repositories::StoreConnection;

use super::simulation::{choose, RandomSource};
use super::ConnectionProvider;

pub const RECENT_LIMIT: i64 = 50;

/// Booking request; every field is optional and defaulted randomly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingRequest {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub consultation_type: Option<String>,
}

impl BookingRequest {
    /// A missing or malformed body is treated as an empty request. Fields are
    /// read one by one, so a mistyped field only loses itself.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self::default(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            patient_id: value.get("patient_id").and_then(Value::as_i64),
            doctor_id: value.get("doctor_id").and_then(Value::as_i64),
            consultation_type: value
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

pub struct ConsultationService {
    connections: ConnectionProvider,
    random: Arc<dyn RandomSource>,
}

impl ConsultationService {
    pub fn new(connections: ConnectionProvider, random: Arc<dyn RandomSource>) -> Self {
        Self {
            connections,
            random,
        }
    }

    fn metrics(&self) -> &AppMetrics {
        self.connections.metrics()
    }

    async fn store(&self) -> Result<Box<dyn StoreConnection>> {
        self.connections
            .acquire_store()
            .await
            .ok_or(AppError::StoreUnavailable)
    }

    pub async fn list_recent(&self) -> Result<ConsultationList> {
        let mut store = self.store().await?;
        let consultations = store.recent_consultations(RECENT_LIMIT).await?;
        Ok(ConsultationList::new(consultations))
    }

    /// Books a consultation. The availability check and the insert are two
    /// separate statements; a doctor going unavailable in between still gets
    /// the booking.
    pub async fn book(&self, request: BookingRequest) -> Result<BookedConsultation> {
        let mut store = self.store().await?;

        let patient_id = request
            .patient_id
            .unwrap_or_else(|| self.random.between(1, 10) as i64);
        let doctor_id = request
            .doctor_id
            .unwrap_or_else(|| self.random.between(1, 9) as i64);
        let consultation_type = request.consultation_type.unwrap_or_else(|| {
            choose(self.random.as_ref(), CONSULTATION_TYPES)
                .unwrap_or("general")
                .to_string()
        });

        let price = store
            .available_doctor_price(doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor not found or unavailable".to_string()))?;

        let booking = NewConsultation::scheduled(
            patient_id,
            doctor_id,
            consultation_type,
            price,
            chrono::Utc::now().naive_utc(),
        );
        let consultation_id = store.insert_consultation(&booking).await?;
        self.metrics().record_consultation("booked");

        tracing::info!(
            consultation_id = consultation_id,
            patient_id = patient_id,
            doctor_id = doctor_id,
            consultation_type = %booking.consultation_type,
            price = price,
            "consultation booked"
        );

        Ok(BookedConsultation {
            consultation_id,
            patient_id,
            doctor_id,
            consultation_type: booking.consultation_type,
            price,
            status: booking.status,
        })
    }
}
