use crate::models::{CryptoAmount, MonetaryAmount, SmallestUnitAmount, TransactionReceipt, UnitPrice};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

/// Everything a caller may want to display about a finished run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentResult {
    pub usd_amount: MonetaryAmount,
    pub unit_price: UnitPrice,
    pub crypto_amount: CryptoAmount,
    pub crypto_display: String,
    pub smallest_unit_amount: SmallestUnitAmount,
    pub receipt: TransactionReceipt,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub asset_id: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}
