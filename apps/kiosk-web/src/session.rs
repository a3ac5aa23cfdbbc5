use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

const SESSION_COOKIE: &str = "sid";
const SESSION_TTL_SECONDS: u64 = 60 * 60 * 24 * 30;

/// One cart line. Prices are not snapshotted here: the cart stores
/// references and checkout re-resolves the current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub tariff_id: i64,
    pub duration_seconds: i64,
    pub quantity: i64,
}

/// Grant delivered to a guest. Lives only in the session; expires with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestGrant {
    pub name: String,
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub level: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub cart: Vec<CartLine>,
    pub promo_code: Option<String>,
    #[serde(default)]
    pub guest_purchases: Vec<GuestGrant>,
    #[serde(default)]
    pub flashes: Vec<Flash>,
}

/// Browser session: an opaque `sid` cookie pointing at a JSON blob in
/// Redis with a rolling TTL. Losing Redis degrades to an empty session,
/// never to an error page.
pub struct Session {
    id: String,
    pub data: SessionData,
}

impl Session {
    pub async fn load(state: &AppState, jar: &CookieJar) -> Self {
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            let id = cookie.value().to_string();
            match state.redis.get(&format!("session:{}", id)).await {
                Ok(Some(raw)) => {
                    if let Ok(data) = serde_json::from_str::<SessionData>(&raw) {
                        return Self { id, data };
                    }
                    warn!("session {} held an unreadable blob, resetting", id);
                }
                Ok(None) => {}
                Err(e) => warn!("session load failed: {:#}", e),
            }
            return Self {
                id,
                data: SessionData::default(),
            };
        }
        Self {
            id: Uuid::new_v4().to_string(),
            data: SessionData::default(),
        }
    }

    /// Writes the session back and returns the jar with the (refreshed)
    /// cookie attached. Call this once per handler, after all mutations.
    pub async fn persist(self, state: &AppState, jar: CookieJar) -> CookieJar {
        match serde_json::to_string(&self.data) {
            Ok(raw) => {
                if let Err(e) = state
                    .redis
                    .set(&format!("session:{}", self.id), &raw, Some(SESSION_TTL_SECONDS))
                    .await
                {
                    warn!("session save failed: {:#}", e);
                }
            }
            Err(e) => warn!("session serialize failed: {}", e),
        }
        let cookie = Cookie::build((SESSION_COOKIE, self.id))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::seconds(SESSION_TTL_SECONDS as i64))
            .build();
        jar.add(cookie)
    }

    /// Telegram id of the logged-in user; guests get None.
    pub fn tg_id(&self) -> Option<i64> {
        self.data.user_id.filter(|id| *id > 0)
    }

    pub fn display_name(&self) -> String {
        self.data
            .first_name
            .clone()
            .or_else(|| self.data.username.clone())
            .unwrap_or_default()
    }

    pub fn cart_count(&self) -> i64 {
        self.data.cart.iter().map(|line| line.quantity).sum()
    }

    pub fn flash(&mut self, level: &str, message: impl Into<String>) {
        self.data.flashes.push(Flash {
            level: level.to_string(),
            message: message.into(),
        });
    }

    /// One-shot: flashes are shown on the next rendered page and dropped.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.data.flashes)
    }

    pub fn clear(&mut self) {
        self.data = SessionData::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_count_sums_quantities() {
        let mut data = SessionData::default();
        data.cart.push(CartLine {
            tariff_id: 1,
            duration_seconds: 0,
            quantity: 1,
        });
        data.cart.push(CartLine {
            tariff_id: 2,
            duration_seconds: 3600,
            quantity: 1,
        });
        let session = Session {
            id: "test".into(),
            data,
        };
        assert_eq!(session.cart_count(), 2);
    }

    #[test]
    fn guest_has_no_tg_id() {
        let session = Session {
            id: "test".into(),
            data: SessionData::default(),
        };
        assert_eq!(session.tg_id(), None);

        let mut data = SessionData::default();
        data.user_id = Some(-1);
        let session = Session {
            id: "test".into(),
            data,
        };
        assert_eq!(session.tg_id(), None);
    }

    #[test]
    fn flashes_are_one_shot() {
        let mut session = Session {
            id: "test".into(),
            data: SessionData::default(),
        };
        session.flash("success", "done");
        assert_eq!(session.take_flashes().len(), 1);
        assert!(session.take_flashes().is_empty());
    }
}
