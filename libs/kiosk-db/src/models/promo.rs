use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub mod discount_type {
    pub const PERCENT: &str = "percent";
    pub const FLAT: &str = "flat";
}

/// `uses_left` NULL means unlimited; `bound_tariff_id` restricts the code
/// to carts containing that tariff.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Promocode {
    pub code: String,
    pub discount_type: String,
    pub discount_value: i64,
    pub max_discount: Option<i64>,
    pub uses_left: Option<i64>,
    pub bound_tariff_id: Option<i64>,
}
