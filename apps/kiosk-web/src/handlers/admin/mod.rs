pub mod categories;
pub mod tariffs;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::handlers::{PageCtx, page_ctx};
use crate::session::Session;
use crate::state::AppState;

/// Admin access is a static allow-list of Telegram ids checked against the
/// session; there is no separate password login.
pub fn is_admin(state: &AppState, session: &Session) -> bool {
    session
        .tg_id()
        .map(|id| state.config.is_admin(id))
        .unwrap_or(false)
}

#[derive(Template, WebTemplate)]
#[template(path = "admin_home.html")]
struct AdminHomeTemplate {
    ctx: PageCtx,
    authorized: bool,
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;
    let authorized = is_admin(&state, &session);
    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (jar, AdminHomeTemplate { ctx, authorized }).into_response()
}

/// Landing page for non-admins: explains how to authenticate. The only
/// /admin route reachable without the allow-list.
pub async fn login_info(State(state): State<AppState>, jar: CookieJar) -> Response {
    index(State(state), jar).await
}
