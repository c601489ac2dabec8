use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::MySql;

use super::{StoreConnection, StoreConnector};
use crate::config::DatabaseSettings;
use crate::error::{AppError, Result};
use crate::models::doctor::decimal_to_f64;
use crate::models::{Consultation, ConsultationRow, Doctor, DoctorRow, NewConsultation};

/// MySQL-backed store. Each `connect` checks a connection out of the pool;
/// it goes back when the returned handle is dropped.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Builds a pool that connects on first use, so startup succeeds while
    /// the database is still down.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Self {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.pool_size)
            .acquire_timeout(settings.connect_timeout())
            .connect_lazy_with(settings.connect_options());
        Self::new(pool)
    }
}

#[async_trait]
impl StoreConnector for MySqlStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>> {
        let conn = self.pool.acquire().await.map_err(AppError::Database)?;
        Ok(Box::new(MySqlStoreConnection { conn }))
    }
}

pub struct MySqlStoreConnection {
    conn: PoolConnection<MySql>,
}

#[async_trait]
impl StoreConnection for MySqlStoreConnection {
    async fn ping(&mut self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&mut *self.conn)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn available_doctors(&mut self) -> Result<Vec<Doctor>> {
        let rows = sqlx::query_as::<_, DoctorRow>(
            r#"
            SELECT id, first_name, last_name, specialty, available, consultation_price
            FROM doctors
            WHERE available = TRUE
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(Doctor::from).collect())
    }

    async fn recent_consultations(&mut self, limit: i64) -> Result<Vec<Consultation>> {
        let rows = sqlx::query_as::<_, ConsultationRow>(
            r#"
            SELECT c.id, c.patient_id, c.doctor_id, c.scheduled_at,
                   c.duration_minutes, c.status, c.consultation_type, c.total_price,
                   c.created_at, d.first_name AS doctor_first_name,
                   d.last_name AS doctor_last_name, d.specialty
            FROM consultations c
            JOIN doctors d ON c.doctor_id = d.id
            ORDER BY c.scheduled_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(Consultation::from).collect())
    }

    async fn available_doctor_price(&mut self, doctor_id: i64) -> Result<Option<f64>> {
        let row: Option<(Decimal,)> = sqlx::query_as(
            r#"
            SELECT consultation_price
            FROM doctors
            WHERE id = ? AND available = TRUE
            "#,
        )
        .bind(doctor_id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|(price,)| decimal_to_f64(price)))
    }

    async fn insert_consultation(&mut self, consultation: &NewConsultation) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO consultations
                (patient_id, doctor_id, scheduled_at, duration_minutes, status, consultation_type, total_price)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(consultation.patient_id)
        .bind(consultation.doctor_id)
        .bind(consultation.scheduled_at)
        .bind(consultation.duration_minutes)
        .bind(&consultation.status)
        .bind(&consultation.consultation_type)
        .bind(consultation.total_price)
        .execute(&mut *self.conn)
        .await
        .map_err(AppError::Database)?;

        Ok(result.last_insert_id())
    }
}
