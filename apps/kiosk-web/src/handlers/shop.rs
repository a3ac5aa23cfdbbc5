use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use kiosk_db::models::catalog::{Category, Tariff, TariffDuration};

use crate::handlers::{PageCtx, page_ctx};
use crate::session::Session;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
struct IndexTemplate {
    ctx: PageCtx,
    categories: Vec<Category>,
    products: Vec<Tariff>,
}

#[derive(Template, WebTemplate)]
#[template(path = "category.html")]
struct CategoryTemplate {
    ctx: PageCtx,
    category_name: String,
    category_description: String,
    subcategories: Vec<Category>,
    products: Vec<Tariff>,
}

#[derive(Template, WebTemplate)]
#[template(path = "product_detail.html")]
struct ProductTemplate {
    ctx: PageCtx,
    product: Tariff,
    durations: Vec<TariffDuration>,
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;

    let categories = match state.categories.roots().await {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load categories: {:#}", e);
            Vec::new()
        }
    };
    // Uncategorized tariffs double as the front-page selection.
    let products = state.tariffs.list_uncategorized().await.unwrap_or_default();

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        IndexTemplate {
            ctx,
            categories,
            products,
        },
    )
        .into_response()
}

pub async fn category(
    State(state): State<AppState>,
    Path(cat_id): Path<i64>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;

    // Id 0 is the synthetic "everything without a category" view.
    let (name, description, subcategories, products) = if cat_id == 0 {
        (
            "Uncategorized".to_string(),
            String::new(),
            Vec::new(),
            state.tariffs.list_uncategorized().await.unwrap_or_default(),
        )
    } else {
        match state.categories.get(cat_id).await {
            Ok(Some(cat)) => (
                cat.name,
                cat.description,
                state.categories.children(cat_id).await.unwrap_or_default(),
                state
                    .tariffs
                    .list_by_category(cat_id)
                    .await
                    .unwrap_or_default(),
            ),
            Ok(None) | Err(_) => {
                session.flash("error", "Category not found");
                let jar = session.persist(&state, jar).await;
                return (jar, Redirect::to("/")).into_response();
            }
        }
    };

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        CategoryTemplate {
            ctx,
            category_name: name,
            category_description: description,
            subcategories,
            products,
        },
    )
        .into_response()
}

pub async fn product_detail(
    State(state): State<AppState>,
    Path(tariff_id): Path<i64>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;

    let product = match state.tariffs.get(tariff_id).await {
        Ok(Some(t)) => t,
        Ok(None) | Err(_) => {
            session.flash("error", "Product not found");
            let jar = session.persist(&state, jar).await;
            return (jar, Redirect::to("/")).into_response();
        }
    };
    let durations = state.tariffs.durations(tariff_id).await.unwrap_or_default();

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        ProductTemplate {
            ctx,
            product,
            durations,
        },
    )
        .into_response()
}
