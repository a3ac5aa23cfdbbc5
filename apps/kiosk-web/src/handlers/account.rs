use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use chrono::DateTime;
use tracing::warn;

use kiosk_db::models::catalog::tariff_type;

use crate::handlers::{PageCtx, page_ctx};
use crate::services::fulfillment::{first_invite, set_auto_approve};
use crate::session::{GuestGrant, Session};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
struct AccountTemplate {
    ctx: PageCtx,
    purchases: Vec<PurchaseRow>,
    guest_purchases: Vec<GuestGrant>,
}

struct PurchaseRow {
    id: i64,
    tariff_name: String,
    t_type: String,
    link: String,
    price: i64,
    expires_at: String,
    active: bool,
}

fn humanize_ts(ts: Option<i64>) -> String {
    ts.and_then(|v| DateTime::from_timestamp(v, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

pub async fn account(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;

    let purchases = match session.tg_id() {
        Some(tg_id) => state
            .purchases
            .list_for_user(tg_id)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|p| PurchaseRow {
                id: p.id,
                tariff_name: p.tariff_name,
                t_type: p.t_type,
                link: p.link,
                price: p.price,
                expires_at: humanize_ts(p.expires_at),
                active: p.active,
            })
            .collect(),
        None => Vec::new(),
    };
    let guest_purchases = session.data.guest_purchases.clone();

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        AccountTemplate {
            ctx,
            purchases,
            guest_purchases,
        },
    )
        .into_response()
}

/// Re-issues the invite link for an owned channel purchase and renews the
/// auto-approve registration. The TTL countdown is left as it is.
pub async fn refresh_access(
    State(state): State<AppState>,
    Path(purchase_id): Path<i64>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;

    let Some(tg_id) = session.tg_id() else {
        session.flash("warning", "Log in with Telegram first");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/account")).into_response();
    };

    let purchases = state.purchases.list_for_user(tg_id).await.unwrap_or_default();
    let Some(purchase) = purchases
        .into_iter()
        .find(|p| p.id == purchase_id && p.t_type == tariff_type::CHANNEL)
    else {
        session.flash("error", "Purchase not found");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/account")).into_response();
    };

    let channel_ids = state
        .tariffs
        .channel_ids(purchase.tariff_id)
        .await
        .unwrap_or_default();
    let channels = state.tariffs.channels_map().await.unwrap_or_default();
    let Some((channel_id, link)) = first_invite(&channel_ids, &channels) else {
        session.flash("warning", "No channel invite links are available");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/account")).into_response();
    };

    if let Err(e) = state
        .purchases
        .refresh_link(tg_id, purchase.tariff_id, &link, Some(channel_id))
        .await
    {
        warn!("link refresh failed for purchase {}: {:#}", purchase_id, e);
        session.flash("error", "Could not refresh the link");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/account")).into_response();
    }
    set_auto_approve(&state, channel_id, tg_id, purchase.ttl_seconds).await;

    session.flash("success", "Invite link refreshed");
    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/account")).into_response()
}
