pub mod mysql;

pub use mysql::{MySqlStore, MySqlStoreConnection};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Consultation, Doctor, NewConsultation};

/// Opens request-scoped connections to the relational store.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>>;
}

/// A connection owned by one request. Dropping it releases the connection.
#[async_trait]
pub trait StoreConnection: Send {
    /// Trivial liveness query.
    async fn ping(&mut self) -> Result<()>;

    async fn available_doctors(&mut self) -> Result<Vec<Doctor>>;

    /// Most recent consultations by scheduled time, newest first.
    async fn recent_consultations(&mut self, limit: i64) -> Result<Vec<Consultation>>;

    /// Price of the doctor if it exists and is available.
    async fn available_doctor_price(&mut self, doctor_id: i64) -> Result<Option<f64>>;

    /// Inserts the consultation and returns its generated id.
    async fn insert_consultation(&mut self, consultation: &NewConsultation) -> Result<u64>;
}
