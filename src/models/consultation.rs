use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::doctor::decimal_to_f64;

pub const DEFAULT_DURATION_MINUTES: i32 = 30;
pub const STATUS_SCHEDULED: &str = "scheduled";
pub const CONSULTATION_TYPES: &[&str] = &["general", "follow_up", "urgent", "specialist"];

/// Consultation joined with its doctor, as read from the store.
#[derive(Debug, Clone, FromRow)]
pub struct ConsultationRow {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub scheduled_at: Option<NaiveDateTime>,
    pub duration_minutes: i32,
    pub status: String,
    pub consultation_type: String,
    pub total_price: Decimal,
    pub created_at: Option<NaiveDateTime>,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
    pub specialty: String,
}

/// Public representation of a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub scheduled_at: Option<NaiveDateTime>,
    pub duration_minutes: i32,
    pub status: String,
    pub consultation_type: String,
    pub total_price: f64,
    pub created_at: Option<NaiveDateTime>,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
    pub specialty: String,
}

impl From<ConsultationRow> for Consultation {
    fn from(row: ConsultationRow) -> Self {
        Self {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            scheduled_at: row.scheduled_at,
            duration_minutes: row.duration_minutes,
            status: row.status,
            consultation_type: row.consultation_type,
            total_price: decimal_to_f64(row.total_price),
            created_at: row.created_at,
            doctor_first_name: row.doctor_first_name,
            doctor_last_name: row.doctor_last_name,
            specialty: row.specialty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationList {
    pub consultations: Vec<Consultation>,
    pub count: usize,
}

impl ConsultationList {
    pub fn new(consultations: Vec<Consultation>) -> Self {
        let count = consultations.len();
        Self {
            consultations,
            count,
        }
    }
}

/// Values inserted for a new booking.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConsultation {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub status: String,
    pub consultation_type: String,
    pub total_price: f64,
}

impl NewConsultation {
    pub fn scheduled(
        patient_id: i64,
        doctor_id: i64,
        consultation_type: String,
        total_price: f64,
        scheduled_at: NaiveDateTime,
    ) -> Self {
        Self {
            patient_id,
            doctor_id,
            scheduled_at,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            status: STATUS_SCHEDULED.to_string(),
            consultation_type,
            total_price,
        }
    }
}

/// Response body for a created booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedConsultation {
    pub consultation_id: u64,
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(rename = "type")]
    pub consultation_type: String,
    pub price: f64,
    pub status: String,
}
