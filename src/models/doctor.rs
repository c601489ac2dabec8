use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row shape of the `doctors` table as stored.
#[derive(Debug, Clone, FromRow)]
pub struct DoctorRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    /// TINYINT(1) flag.
    pub available: i8,
    /// DECIMAL(10,2) price.
    pub consultation_price: Decimal,
}

/// Public representation of a doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub available: bool,
    pub consultation_price: f64,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            specialty: row.specialty,
            available: row.available != 0,
            consultation_price: decimal_to_f64(row.consultation_price),
        }
    }
}

/// Payload served by the doctors listing and cached verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorList {
    pub doctors: Vec<Doctor>,
    pub count: usize,
}

impl DoctorList {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        let count = doctors.len();
        Self { doctors, count }
    }
}

pub(crate) fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
