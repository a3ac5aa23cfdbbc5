use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::promo::Promocode;

#[derive(Debug, Clone)]
pub struct PromoRepository {
    pool: PgPool,
}

impl PromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, code: &str) -> Result<Option<Promocode>> {
        sqlx::query_as::<_, Promocode>(
            "SELECT code, discount_type, discount_value, max_discount, uses_left, bound_tariff_id \
             FROM promocodes WHERE code = $1",
        )
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch promo code")
    }

    /// No-op for unlimited codes (NULL uses_left) and codes already at zero.
    pub async fn decrement_use(&self, code: &str) -> Result<()> {
        sqlx::query(
            "UPDATE promocodes SET uses_left = uses_left - 1 \
             WHERE code = $1 AND uses_left IS NOT NULL AND uses_left > 0",
        )
        .bind(code.trim())
        .execute(&self.pool)
        .await
        .context("Failed to decrement promo uses")?;
        Ok(())
    }
}
