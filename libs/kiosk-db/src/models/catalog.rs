use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Tariff type discriminators as stored in `tariffs.t_type`. Anything
/// outside this set is fulfilled the same way as a channel.
pub mod tariff_type {
    pub const CHANNEL: &str = "channel";
    pub const TEXT: &str = "text";
    pub const STATUS: &str = "status";
    pub const BUNDLE: &str = "bundle";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tariff {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub t_type: String,
    pub payload: String,
    pub status_name: Option<String>,
    pub category_id: Option<i64>,
}

/// Tariff joined with its category name for the admin listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TariffWithCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub t_type: String,
    pub payload: String,
    pub status_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TariffDuration {
    pub id: i64,
    pub tariff_id: i64,
    pub name: String,
    pub seconds: i64,
    pub price: i64,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Channel {
    pub id: i64,
    pub title: String,
    pub invite_link: Option<String>,
}
