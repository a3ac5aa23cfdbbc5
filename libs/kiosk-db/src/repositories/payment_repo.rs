use anyhow::{Context, Result};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Claim-for-delivery: the unique insert either takes the payment or
    /// loses to whoever already did. Returns whether this caller won.
    pub async fn insert_once(
        &self,
        guid: &str,
        user_id: i64,
        tariff_id: i64,
        amount: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO payments (guid, user_id, tariff_id, amount) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (guid) DO NOTHING",
        )
        .bind(guid)
        .bind(user_id)
        .bind(tariff_id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .context("Failed to record processed payment")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_processed(&self, guid: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE guid = $1)")
            .bind(guid)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check payment marker")
    }
}
