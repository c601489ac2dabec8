use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LatencyRange;
use crate::error::{AppError, Result};
use crate::observability::AppMetrics;

use super::simulation::{draw_failure, simulate_latency, RandomSource};

pub const GATEWAY: &str = "stripe-simulator";
pub const SETTLEMENT_CURRENCY: &str = "EUR";
pub const FAILURE_MESSAGE: &str = "Payment gateway timeout. Please retry.";

/// Successful payment response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub status: String,
    pub transaction_id: String,
    pub message: String,
}

impl PaymentReceipt {
    fn success(transaction_id: String) -> Self {
        Self {
            status: "success".to_string(),
            transaction_id,
            message: "Payment processed successfully".to_string(),
        }
    }
}

/// Simulated payment gateway with a configurable failure rate.
pub struct PaymentService {
    metrics: Arc<AppMetrics>,
    random: Arc<dyn RandomSource>,
    failure_rate: f64,
    latency: LatencyRange,
}

impl PaymentService {
    pub fn new(
        metrics: Arc<AppMetrics>,
        random: Arc<dyn RandomSource>,
        failure_rate: f64,
        latency: LatencyRange,
    ) -> Self {
        Self {
            metrics,
            random,
            failure_rate,
            latency,
        }
    }

    /// Waits out the gateway latency, then makes one failure draw.
    pub async fn process(&self) -> Result<PaymentReceipt> {
        simulate_latency(self.random.as_ref(), self.latency).await;

        if draw_failure(self.random.as_ref(), self.failure_rate) {
            self.metrics.record_payment_failure();
            tracing::error!(
                error = "Payment gateway timeout",
                gateway = GATEWAY,
                "payment processing failed"
            );
            return Err(AppError::SimulatedFailure(FAILURE_MESSAGE.to_string()));
        }

        let amount = self.settlement_amount();
        let transaction_id = format!("txn_{}", self.random.between(100_000, 999_999));
        self.metrics.record_payment_success();
        tracing::info!(
            amount = amount,
            currency = SETTLEMENT_CURRENCY,
            gateway = GATEWAY,
            transaction_id = %transaction_id,
            "payment processed successfully"
        );

        Ok(PaymentReceipt::success(transaction_id))
    }

    /// Amount in cents drawn from [2500, 6000], so the value is already rounded.
    fn settlement_amount(&self) -> f64 {
        self.random.between(2_500, 6_000) as f64 / 100.0
    }
}
