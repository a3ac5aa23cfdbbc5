use askama::Template;
use askama_web::WebTemplate;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::handlers::{PageCtx, page_ctx};
use crate::services::cart::{enrich, requires_login};
use crate::services::fulfillment::deliver_order;
use crate::services::payment::{PaymentState, classify_status};
use crate::services::pending::PendingOrder;
use crate::services::promo::evaluate_promo;
use crate::session::Session;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "payment.html")]
struct PaymentTemplate {
    ctx: PageCtx,
    payment_id: String,
    amount: i64,
    redirect_url: String,
    poll_interval: u64,
    poll_attempts: u64,
}

pub async fn checkout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;

    if session.data.cart.is_empty() {
        session.flash("error", "The cart is empty");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/cart")).into_response();
    }

    let cart = enrich(&state, &session.data.cart).await;

    // Channel access is granted by Telegram id, so those carts cannot be
    // paid for anonymously.
    if session.tg_id().is_none() && requires_login(&cart.items) {
        session.flash(
            "warning",
            "Channel access requires logging in with Telegram first",
        );
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/cart")).into_response();
    }

    // Authoritative promo pass; the cart page only previewed it.
    let mut total = cart.total;
    let mut applied_code = None;
    if let Some(code) = session.data.promo_code.clone() {
        match state.promos.get(&code).await {
            Ok(Some(promo)) => {
                let has_active = match session.tg_id() {
                    Some(tg_id) => state.purchases.has_active(tg_id).await.unwrap_or(false),
                    None => false,
                };
                match evaluate_promo(&cart.items, cart.total, has_active, &promo) {
                    Some(discount) => {
                        total = (cart.total - discount).max(0);
                        applied_code = Some(code);
                    }
                    None => {
                        session.data.promo_code = None;
                        warn!("promo {} not applicable at checkout, dropped", code);
                    }
                }
            }
            Ok(None) => {
                session.data.promo_code = None;
            }
            Err(e) => warn!("promo lookup failed at checkout: {:#}", e),
        }
    }

    let payment_id = Uuid::new_v4().to_string();
    let redirect_url = match state.gateway.create_transaction(&payment_id, total).await {
        Ok(url) => url,
        Err(e) => {
            error!("payment initialization failed: {:#}", e);
            session.flash("error", "Payment initialization failed, please try again");
            let jar = session.persist(&state, jar).await;
            return (jar, Redirect::to("/cart")).into_response();
        }
    };

    state.pending.insert(
        payment_id.clone(),
        PendingOrder {
            user_id: session.tg_id(),
            items: cart.items,
            total,
            promo_code: applied_code,
            redirect_url,
            delivered: false,
            created_at: Utc::now().timestamp(),
        },
    );

    info!("checkout created pending order {}", payment_id);
    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to(&format!("/payment/{}", payment_id))).into_response()
}

pub async fn payment_page(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;

    // Unknown id usually means a provider return after a restart; render
    // the placeholder rather than a 404.
    let (amount, redirect_url) = match state.pending.get(&payment_id) {
        Some(order) => (order.total, order.redirect_url),
        None => (0, String::new()),
    };

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        PaymentTemplate {
            ctx,
            payment_id,
            amount,
            redirect_url,
            poll_interval: state.config.payment_poll_interval,
            poll_attempts: state.config.payment_poll_attempts,
        },
    )
        .into_response()
}

/// Client-driven state machine: the payment page polls here until the
/// provider settles. A confirmed status triggers at-most-once delivery.
pub async fn payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    jar: CookieJar,
) -> Response {
    let status = match state.gateway.check_status(&payment_id).await {
        Ok(s) => s,
        Err(e) => {
            // Transient by contract: the client keeps polling.
            warn!("status check failed for {}: {:#}", payment_id, e);
            return Json(json!({
                "ok": false,
                "status": "error",
                "message": "status check failed",
            }))
            .into_response();
        }
    };

    match classify_status(&status) {
        PaymentState::Confirmed => {
            if let Some(order) = state.pending.claim(&payment_id) {
                let mut session = Session::load(&state, &jar).await;
                match deliver_order(&state, &payment_id, &order).await {
                    Ok(grants) => {
                        session.data.guest_purchases.extend(grants);
                        session.data.cart.clear();
                        session.data.promo_code = None;
                        let jar = session.persist(&state, jar).await;
                        return (jar, Json(json!({"ok": true, "status": "confirmed"})))
                            .into_response();
                    }
                    Err(e) => {
                        // Roll the claim back so a later poll retries.
                        error!("delivery failed for {}: {:#}", payment_id, e);
                        state.pending.release(&payment_id);
                    }
                }
            }
            Json(json!({"ok": true, "status": "confirmed"})).into_response()
        }
        PaymentState::Pending => Json(json!({"ok": true, "status": "pending"})).into_response(),
        PaymentState::Other(other) => {
            Json(json!({"ok": true, "status": other})).into_response()
        }
    }
}
