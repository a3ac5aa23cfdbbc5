use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;

use crate::models::purchase::{PurchaseWithTariff, accumulate_ttl, expires_from_ttl};

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, tg_id: i64) -> Result<Vec<PurchaseWithTariff>> {
        sqlx::query_as::<_, PurchaseWithTariff>(
            "SELECT p.id, p.user_id, p.tariff_id, p.link, p.price, p.payment_id, p.ttl_seconds, \
                    p.last_channel_id, p.bought_at, p.last_ttl_update, p.activated, p.active, \
                    p.expires_at, t.name AS tariff_name, t.t_type \
             FROM purchases p JOIN tariffs t ON t.id = p.tariff_id \
             WHERE p.user_id = $1 ORDER BY p.bought_at DESC",
        )
        .bind(tg_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch purchases")
    }

    pub async fn has_active(&self, tg_id: i64) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = $1 AND active = TRUE)",
        )
        .bind(tg_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check purchase history")
    }

    /// One row per (user, tariff): a repeat purchase folds the new duration
    /// into the remaining TTL instead of inserting a second row. The row is
    /// locked for the duration of the transaction so two concurrent grants
    /// cannot both read the old TTL.
    pub async fn upsert(
        &self,
        tg_id: i64,
        tariff_id: i64,
        price: i64,
        link: &str,
        duration_seconds: Option<i64>,
        channel_id: Option<i64>,
        payment_id: &str,
    ) -> Result<i64> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64, Option<i64>)> = sqlx::query_as(
            "SELECT id, ttl_seconds FROM purchases WHERE user_id = $1 AND tariff_id = $2 FOR UPDATE",
        )
        .bind(tg_id)
        .bind(tariff_id)
        .fetch_optional(&mut *tx)
        .await?;

        let id = match existing {
            Some((id, current_ttl)) => {
                let new_ttl = accumulate_ttl(current_ttl, duration_seconds);
                let expires_at = expires_from_ttl(now, new_ttl);
                sqlx::query(
                    "UPDATE purchases SET link = $1, price = $2, payment_id = $3, ttl_seconds = $4, \
                            last_channel_id = COALESCE($5, last_channel_id), active = TRUE, \
                            last_ttl_update = $6, expires_at = $7 \
                     WHERE id = $8",
                )
                .bind(link)
                .bind(price)
                .bind(payment_id)
                .bind(new_ttl)
                .bind(channel_id)
                .bind(now)
                .bind(expires_at)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => {
                let expires_at = expires_from_ttl(now, duration_seconds);
                sqlx::query_scalar(
                    "INSERT INTO purchases (user_id, tariff_id, link, price, payment_id, ttl_seconds, \
                            last_channel_id, bought_at, last_ttl_update, activated, active, expires_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, TRUE, $10) RETURNING id",
                )
                .bind(tg_id)
                .bind(tariff_id)
                .bind(link)
                .bind(price)
                .bind(payment_id)
                .bind(duration_seconds)
                .bind(channel_id)
                .bind(now)
                .bind(now)
                .bind(expires_at)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await.context("Failed to upsert purchase")?;
        Ok(id)
    }

    /// Re-issues the invite link without touching the TTL countdown.
    pub async fn refresh_link(
        &self,
        tg_id: i64,
        tariff_id: i64,
        link: &str,
        channel_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE purchases SET link = $1, last_channel_id = COALESCE($2, last_channel_id) \
             WHERE user_id = $3 AND tariff_id = $4",
        )
        .bind(link)
        .bind(channel_id)
        .bind(tg_id)
        .bind(tariff_id)
        .execute(&self.pool)
        .await
        .context("Failed to refresh purchase link")?;
        Ok(())
    }
}
