use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Access grant for a (user, tariff) pair. `ttl_seconds` semantics:
/// NULL = unlimited, 0 = none, positive = remaining seconds counted from
/// `last_ttl_update`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: i64,
    pub user_id: i64,
    pub tariff_id: i64,
    pub link: String,
    pub price: i64,
    pub payment_id: String,
    pub ttl_seconds: Option<i64>,
    pub last_channel_id: Option<i64>,
    pub bought_at: i64,
    pub last_ttl_update: i64,
    pub activated: bool,
    pub active: bool,
    pub expires_at: Option<i64>,
}

/// Purchase joined with its tariff's name and type for the account page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PurchaseWithTariff {
    pub id: i64,
    pub user_id: i64,
    pub tariff_id: i64,
    pub link: String,
    pub price: i64,
    pub payment_id: String,
    pub ttl_seconds: Option<i64>,
    pub last_channel_id: Option<i64>,
    pub bought_at: i64,
    pub last_ttl_update: i64,
    pub activated: bool,
    pub active: bool,
    pub expires_at: Option<i64>,
    pub tariff_name: String,
    pub t_type: String,
}

/// A repeat purchase extends the remaining TTL instead of replacing it;
/// an unlimited grant (None) stays unlimited regardless of history, and a
/// zero duration resets the countdown to "none".
pub fn accumulate_ttl(current: Option<i64>, duration: Option<i64>) -> Option<i64> {
    match duration {
        None => None,
        Some(0) => Some(0),
        Some(d) => Some(current.unwrap_or(0) + d),
    }
}

pub fn expires_from_ttl(now: i64, ttl: Option<i64>) -> Option<i64> {
    match ttl {
        Some(t) if t > 0 => Some(now + t),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_purchase_accumulates_ttl() {
        assert_eq!(accumulate_ttl(Some(3600), Some(1800)), Some(5400));
        assert_eq!(accumulate_ttl(None, Some(1800)), Some(1800));
        assert_eq!(accumulate_ttl(Some(0), Some(600)), Some(600));
    }

    #[test]
    fn unlimited_duration_overrides_countdown() {
        assert_eq!(accumulate_ttl(Some(3600), None), None);
        assert_eq!(accumulate_ttl(None, None), None);
    }

    #[test]
    fn zero_duration_resets_to_none() {
        assert_eq!(accumulate_ttl(Some(3600), Some(0)), Some(0));
    }

    #[test]
    fn expiry_only_for_positive_ttl() {
        assert_eq!(expires_from_ttl(1_000, Some(5400)), Some(6400));
        assert_eq!(expires_from_ttl(1_000, Some(0)), None);
        assert_eq!(expires_from_ttl(1_000, None), None);
    }
}
