use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub tg_id: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}
