use anyhow::{Context, Result};
use std::env;

/// Runtime configuration, read once at startup from the environment
/// (a `.env` file is honored via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,

    pub platega_merchant_id: String,
    pub platega_api_key: String,
    pub platega_create_url: String,
    /// Status endpoint template; `{payment_id}` is substituted per request.
    pub platega_status_url: String,

    /// Base URL of this site, used for provider return/failure redirects.
    pub site_url: String,

    pub telegram_login_bot: String,
    pub telegram_login_token: String,
    pub status_bot_link: String,

    pub admins: Vec<i64>,

    pub payment_poll_interval: u64,
    pub payment_poll_attempts: u64,

    pub listen_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379/0".to_string()),
            platega_merchant_id: env::var("PLATEGA_MERCHANT_ID")
                .unwrap_or_else(|_| "TEST_MERCHANT_ID".to_string()),
            platega_api_key: env::var("PLATEGA_API_KEY")
                .unwrap_or_else(|_| "TEST_SECRET_KEY".to_string()),
            platega_create_url: env::var("PLATEGA_CREATE_URL")
                .unwrap_or_else(|_| "https://app.platega.io/transaction/process".to_string()),
            platega_status_url: env::var("PLATEGA_STATUS_URL")
                .unwrap_or_else(|_| "https://app.platega.io/transaction/{payment_id}".to_string()),
            site_url: env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            telegram_login_bot: env::var("TELEGRAM_LOGIN_BOT").unwrap_or_default(),
            telegram_login_token: env::var("TELEGRAM_LOGIN_TOKEN").unwrap_or_default(),
            status_bot_link: env::var("STATUS_BOT_LINK").unwrap_or_default(),
            admins: parse_admins(&env::var("ADMINS").unwrap_or_default()),
            payment_poll_interval: env::var("PAYMENT_POLL_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            payment_poll_attempts: env::var("PAYMENT_POLL_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(45),
            listen_port: env::var("LISTEN_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }

    pub fn is_admin(&self, tg_id: i64) -> bool {
        self.admins.contains(&tg_id)
    }
}

/// Comma-separated Telegram ids; malformed entries are skipped.
fn parse_admins(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_list_skips_garbage() {
        assert_eq!(parse_admins("123, 456 ,abc,,789"), vec![123, 456, 789]);
        assert!(parse_admins("").is_empty());
    }
}
