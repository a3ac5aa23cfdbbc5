use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::catalog::{Channel, Tariff, TariffDuration, TariffWithCategory};

#[derive(Debug, Clone)]
pub struct NewTariff {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub t_type: String,
    pub payload: String,
    pub status_name: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct TariffRepository {
    pool: PgPool,
}

impl TariffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<TariffWithCategory>> {
        sqlx::query_as::<_, TariffWithCategory>(
            "SELECT t.id, t.name, t.description, t.price, t.t_type, t.payload, t.status_name, t.category_id, \
                    COALESCE(c.name, '') AS category_name \
             FROM tariffs t LEFT JOIN categories c ON c.id = t.category_id \
             ORDER BY LOWER(t.name)",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tariffs")
    }

    pub async fn list_by_category(&self, category_id: i64) -> Result<Vec<Tariff>> {
        sqlx::query_as::<_, Tariff>(
            "SELECT id, name, description, price, t_type, payload, status_name, category_id \
             FROM tariffs WHERE category_id = $1 ORDER BY LOWER(name)",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tariffs by category")
    }

    pub async fn list_uncategorized(&self) -> Result<Vec<Tariff>> {
        sqlx::query_as::<_, Tariff>(
            "SELECT id, name, description, price, t_type, payload, status_name, category_id \
             FROM tariffs WHERE category_id IS NULL ORDER BY LOWER(name)",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch uncategorized tariffs")
    }

    pub async fn get(&self, id: i64) -> Result<Option<Tariff>> {
        sqlx::query_as::<_, Tariff>(
            "SELECT id, name, description, price, t_type, payload, status_name, category_id \
             FROM tariffs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch tariff")
    }

    pub async fn create(&self, tariff: NewTariff) -> Result<i64> {
        sqlx::query_scalar(
            "INSERT INTO tariffs (name, description, price, t_type, payload, status_name, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(tariff.name.trim())
        .bind(tariff.description.trim())
        .bind(tariff.price)
        .bind(&tariff.t_type)
        .bind(&tariff.payload)
        .bind(&tariff.status_name)
        .bind(tariff.category_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create tariff")
    }

    /// `payload`/`status_name` are only overwritten when the form submitted
    /// them; the tariff type itself is immutable after creation.
    pub async fn update(
        &self,
        id: i64,
        name: &str,
        description: &str,
        price: i64,
        category_id: Option<i64>,
        payload: Option<&str>,
        status_name: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE tariffs SET name = $1, description = $2, price = $3, category_id = $4, \
                    payload = COALESCE($5, payload), status_name = COALESCE($6, status_name) \
             WHERE id = $7",
        )
        .bind(name.trim())
        .bind(description.trim())
        .bind(price)
        .bind(category_id)
        .bind(payload)
        .bind(status_name)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update tariff")?;
        Ok(())
    }

    /// Also drops per-tariff payment markers; durations, channel bindings
    /// and bundle membership go away via ON DELETE CASCADE.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM payments WHERE tariff_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tariffs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.context("Failed to delete tariff")?;
        Ok(())
    }

    pub async fn durations(&self, tariff_id: i64) -> Result<Vec<TariffDuration>> {
        sqlx::query_as::<_, TariffDuration>(
            "SELECT id, tariff_id, name, seconds, price, is_default \
             FROM tariff_durations WHERE tariff_id = $1 ORDER BY seconds",
        )
        .bind(tariff_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tariff durations")
    }

    /// At most one default per tariff: inserting a new default clears the
    /// others in the same transaction.
    pub async fn add_duration(
        &self,
        tariff_id: i64,
        name: &str,
        seconds: i64,
        price: i64,
        is_default: bool,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if is_default {
            sqlx::query("UPDATE tariff_durations SET is_default = FALSE WHERE tariff_id = $1")
                .bind(tariff_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO tariff_durations (tariff_id, name, seconds, price, is_default) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(tariff_id)
        .bind(name.trim())
        .bind(seconds)
        .bind(price)
        .bind(is_default)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.context("Failed to add tariff duration")?;
        Ok(())
    }

    pub async fn delete_duration(&self, duration_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM tariff_durations WHERE id = $1")
            .bind(duration_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete tariff duration")?;
        Ok(())
    }

    pub async fn channel_ids(&self, tariff_id: i64) -> Result<Vec<i64>> {
        sqlx::query_scalar("SELECT channel_id FROM tariff_channels WHERE tariff_id = $1")
            .bind(tariff_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch tariff channels")
    }

    pub async fn channels_map(&self) -> Result<HashMap<i64, Channel>> {
        let rows = sqlx::query_as::<_, Channel>("SELECT id, title, invite_link FROM channels")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch channels")?;
        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }

    pub async fn bundle_items(&self, bundle_id: i64) -> Result<Vec<i64>> {
        sqlx::query_scalar("SELECT item_tariff_id FROM bundle_items WHERE bundle_id = $1")
            .bind(bundle_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch bundle items")
    }

    /// Replaces the bundle composition. A bundle never contains itself and
    /// duplicate submissions collapse into one row.
    pub async fn set_bundle_items(&self, bundle_id: i64, item_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bundle_items WHERE bundle_id = $1")
            .bind(bundle_id)
            .execute(&mut *tx)
            .await?;

        for item_id in item_ids {
            if *item_id == bundle_id {
                continue;
            }
            sqlx::query(
                "INSERT INTO bundle_items (bundle_id, item_tariff_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(bundle_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.context("Failed to update bundle items")?;
        Ok(())
    }
}
