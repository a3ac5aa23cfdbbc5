pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod shop;

use axum::http::HeaderMap;
use axum::http::header::REFERER;

use crate::session::{Flash, Session};
use crate::state::AppState;

/// Fields every rendered page needs: one-shot flashes, the cart badge and
/// the login state for the navigation bar.
pub struct PageCtx {
    pub flashes: Vec<Flash>,
    pub cart_count: i64,
    pub user_name: String,
    pub logged_in: bool,
    pub is_admin: bool,
    pub login_bot: String,
}

/// Builds the shared context. Takes the flashes out of the session, so the
/// session must be persisted afterwards.
pub fn page_ctx(state: &AppState, session: &mut Session) -> PageCtx {
    let is_admin = session
        .tg_id()
        .map(|id| state.config.is_admin(id))
        .unwrap_or(false);
    PageCtx {
        flashes: session.take_flashes(),
        cart_count: session.cart_count(),
        user_name: session.display_name(),
        logged_in: session.tg_id().is_some(),
        is_admin,
        login_bot: state.config.telegram_login_bot.clone(),
    }
}

/// Where "go back" should land: the referring page, or the index.
pub fn back_url(headers: &HeaderMap) -> String {
    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("/")
        .to_string()
}
