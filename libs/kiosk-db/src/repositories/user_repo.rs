use anyhow::{Context, Result};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent registration on Telegram login. An existing row is left
    /// untouched, including its admin flag.
    pub async fn ensure(&self, tg_id: i64, is_admin: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (tg_id, is_admin) VALUES ($1, $2) ON CONFLICT (tg_id) DO NOTHING",
        )
        .bind(tg_id)
        .bind(is_admin)
        .execute(&self.pool)
        .await
        .context("Failed to ensure user row")?;
        Ok(())
    }
}
