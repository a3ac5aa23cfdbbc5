use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use crate::services::telegram_auth::verify_widget_hash;
use crate::session::Session;
use crate::state::AppState;

/// Telegram Login Widget callback. The widget redirects here with the
/// signed field set as query parameters.
pub async fn tg_login(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;

    if !verify_widget_hash(&params, &state.config.telegram_login_token) {
        session.flash("error", "Telegram login could not be verified");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/")).into_response();
    }

    let Some(tg_id) = params.get("id").and_then(|v| v.parse::<i64>().ok()) else {
        session.flash("error", "Telegram login could not be verified");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/")).into_response();
    };

    session.data.user_id = Some(tg_id);
    session.data.first_name = params.get("first_name").cloned();
    session.data.username = params.get("username").cloned();

    // Best-effort registration; a failure must not block the login.
    if let Err(e) = state
        .users
        .ensure(tg_id, state.config.is_admin(tg_id))
        .await
    {
        warn!("user row upsert failed for {}: {:#}", tg_id, e);
    }

    info!("telegram login for {}", tg_id);
    session.flash("success", "Logged in with Telegram");
    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/")).into_response()
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;
    session.clear();
    session.flash("info", "Logged out");
    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/")).into_response()
}
