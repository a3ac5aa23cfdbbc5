use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Processed-payment marker. The `guid` is the provider-side payment id;
/// the row existing at all is what prevents double fulfillment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub guid: String,
    pub user_id: i64,
    pub tariff_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}
