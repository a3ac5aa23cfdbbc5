use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;

use crate::handlers::{PageCtx, back_url, page_ctx};
use crate::services::cart::{CartItemView, enrich};
use crate::services::promo::evaluate_promo;
use crate::session::{CartLine, Session};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
struct CartTemplate {
    ctx: PageCtx,
    items: Vec<CartRow>,
    total: i64,
    promo_code: String,
    discount: i64,
    total_after: i64,
}

struct CartRow {
    tariff_id: i64,
    name: String,
    duration_seconds: i64,
    duration_label: String,
    price: i64,
    quantity: i64,
    subtotal: i64,
}

impl From<CartItemView> for CartRow {
    fn from(item: CartItemView) -> Self {
        Self {
            tariff_id: item.tariff_id,
            name: item.name,
            duration_seconds: item.duration_seconds,
            duration_label: item.duration_name.unwrap_or_default(),
            price: item.price,
            quantity: item.quantity,
            subtotal: item.subtotal,
        }
    }
}

#[derive(Deserialize)]
pub struct AddToCartForm {
    pub tariff_id: i64,
    pub duration: Option<String>,
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let mut session = Session::load(&state, &jar).await;

    let duration = form
        .duration
        .as_deref()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(0);

    let duplicate = session
        .data
        .cart
        .iter()
        .any(|line| line.tariff_id == form.tariff_id && line.duration_seconds == duration);
    if duplicate {
        session.flash("warning", "Item is already in the cart");
    } else {
        session.data.cart.push(CartLine {
            tariff_id: form.tariff_id,
            duration_seconds: duration,
            quantity: 1,
        });
        session.flash("success", "Item added to the cart");
    }

    let back = back_url(&headers);
    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to(&back)).into_response()
}

#[derive(Deserialize)]
pub struct RemoveFromCartForm {
    pub tariff_id: i64,
    pub duration_seconds: i64,
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let mut session = Session::load(&state, &jar).await;

    session.data.cart.retain(|line| {
        line.tariff_id != form.tariff_id || line.duration_seconds != form.duration_seconds
    });
    session.flash("info", "Item removed from the cart");

    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/cart")).into_response()
}

pub async fn view_cart(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;

    let cart = enrich(&state, &session.data.cart).await;

    // Preview pass of the same evaluation checkout runs authoritatively.
    let mut discount = 0;
    let mut promo_code = String::new();
    if let Some(code) = session.data.promo_code.clone() {
        match state.promos.get(&code).await {
            Ok(Some(promo)) => {
                let has_active = match session.tg_id() {
                    Some(tg_id) => state.purchases.has_active(tg_id).await.unwrap_or(false),
                    None => false,
                };
                match evaluate_promo(&cart.items, cart.total, has_active, &promo) {
                    Some(d) => {
                        discount = d;
                        promo_code = code;
                    }
                    None => {
                        session.data.promo_code = None;
                        session.flash("warning", "Promo code is not applicable");
                    }
                }
            }
            Ok(None) => {
                session.data.promo_code = None;
                session.flash("warning", "Promo code not found");
            }
            Err(e) => {
                // Transient: keep the code, checkout will re-evaluate.
                warn!("promo lookup failed for {}: {:#}", code, e);
            }
        }
    }

    let total_after = (cart.total - discount).max(0);
    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        CartTemplate {
            ctx,
            items: cart.items.into_iter().map(CartRow::from).collect(),
            total: cart.total,
            promo_code,
            discount,
            total_after,
        },
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct ApplyPromoForm {
    pub promo_code: Option<String>,
}

pub async fn apply_promo(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ApplyPromoForm>,
) -> Response {
    let mut session = Session::load(&state, &jar).await;

    let code = form.promo_code.unwrap_or_default().trim().to_string();
    if code.is_empty() {
        session.data.promo_code = None;
    } else {
        session.data.promo_code = Some(code);
        session.flash("success", "Promo code applied, it will be validated at payment");
    }

    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/cart")).into_response()
}
