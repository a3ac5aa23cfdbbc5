use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;

use kiosk_db::models::catalog::{TariffDuration, TariffWithCategory, tariff_type};
use kiosk_db::repositories::tariff_repo::NewTariff;

use crate::handlers::admin::categories::ParentOption;
use crate::handlers::admin::is_admin;
use crate::handlers::{PageCtx, page_ctx};
use crate::session::Session;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "admin_tariffs.html")]
struct TariffsTemplate {
    ctx: PageCtx,
    tariffs: Vec<TariffWithCategory>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin_tariff_new.html")]
struct TariffNewTemplate {
    ctx: PageCtx,
    categories: Vec<ParentOption>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin_tariff_edit.html")]
struct TariffEditTemplate {
    ctx: PageCtx,
    tariff_id: i64,
    name: String,
    description: String,
    price: i64,
    t_type: String,
    payload: String,
    status_name: String,
    categories: Vec<ParentOption>,
    durations: Vec<TariffDuration>,
    supports_durations: bool,
    is_bundle: bool,
    bundle_options: Vec<BundleOption>,
}

struct BundleOption {
    id: i64,
    name: String,
    checked: bool,
}

async fn category_options(state: &AppState, selected: Option<i64>) -> Vec<ParentOption> {
    state
        .categories
        .roots()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|c| ParentOption {
            selected: selected == Some(c.id),
            id: c.id,
            name: c.name,
        })
        .collect()
}

pub async fn list(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let tariffs = state.tariffs.list_all().await.unwrap_or_default();
    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (jar, TariffsTemplate { ctx, tariffs }).into_response()
}

pub async fn new_form(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let categories = category_options(&state, None).await;
    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (jar, TariffNewTemplate { ctx, categories }).into_response()
}

#[derive(Deserialize)]
pub struct NewTariffForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub t_type: Option<String>,
    pub category_id: Option<String>,
    pub text_content: Option<String>,
    pub status_name: Option<String>,
    pub source_link: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<NewTariffForm>,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let name = form.name.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        session.flash("error", "Enter a product name");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/tariffs/new")).into_response();
    }

    let t_type = form
        .t_type
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| tariff_type::CHANNEL.to_string());
    // The payload column means different things per type; bundles carry none.
    let (payload, status_name) = match t_type.as_str() {
        tariff_type::TEXT => (form.text_content.unwrap_or_default(), None),
        tariff_type::STATUS => (String::new(), Some(form.status_name.unwrap_or_default())),
        tariff_type::CHANNEL => (form.source_link.unwrap_or_default(), None),
        _ => (String::new(), None),
    };

    let tariff = NewTariff {
        name,
        description: form.description.unwrap_or_default(),
        price: form.price.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0),
        t_type: t_type.clone(),
        payload,
        status_name,
        category_id: form.category_id.as_deref().and_then(|v| v.parse().ok()),
    };

    match state.tariffs.create(tariff).await {
        Ok(new_id) => {
            session.flash("success", "Product created");
            // Bundles go straight to the editor to pick their contents.
            let target = if t_type == tariff_type::BUNDLE {
                format!("/admin/tariffs/{}/edit", new_id)
            } else {
                "/admin/tariffs".to_string()
            };
            let jar = session.persist(&state, jar).await;
            (jar, Redirect::to(&target)).into_response()
        }
        Err(e) => {
            error!("tariff create failed: {:#}", e);
            session.flash("error", "Could not create the product");
            let jar = session.persist(&state, jar).await;
            (jar, Redirect::to("/admin/tariffs")).into_response()
        }
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(tariff_id): Path<i64>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let tariff = match state.tariffs.get(tariff_id).await {
        Ok(Some(t)) => t,
        Ok(None) | Err(_) => {
            session.flash("error", "Product not found");
            let jar = session.persist(&state, jar).await;
            return (jar, Redirect::to("/admin/tariffs")).into_response();
        }
    };

    let categories = category_options(&state, tariff.category_id).await;
    let durations = state.tariffs.durations(tariff_id).await.unwrap_or_default();
    let is_bundle = tariff.t_type == tariff_type::BUNDLE;

    let bundle_options = if is_bundle {
        let chosen = state.tariffs.bundle_items(tariff_id).await.unwrap_or_default();
        state
            .tariffs
            .list_all()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|t| t.t_type != tariff_type::BUNDLE && t.id != tariff_id)
            .map(|t| BundleOption {
                checked: chosen.contains(&t.id),
                id: t.id,
                name: t.name,
            })
            .collect()
    } else {
        Vec::new()
    };

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        TariffEditTemplate {
            ctx,
            tariff_id,
            name: tariff.name,
            description: tariff.description,
            price: tariff.price,
            t_type: tariff.t_type.clone(),
            payload: tariff.payload,
            status_name: tariff.status_name.unwrap_or_default(),
            categories,
            durations,
            supports_durations: !is_bundle,
            is_bundle,
            bundle_options,
        },
    )
        .into_response()
}

pub async fn update(
    State(state): State<AppState>,
    Path(tariff_id): Path<i64>,
    jar: CookieJar,
    Form(raw_form): Form<Vec<(String, String)>>,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let tariff = match state.tariffs.get(tariff_id).await {
        Ok(Some(t)) => t,
        Ok(None) | Err(_) => {
            session.flash("error", "Product not found");
            let jar = session.persist(&state, jar).await;
            return (jar, Redirect::to("/admin/tariffs")).into_response();
        }
    };

    let mut name = String::new();
    let mut description = String::new();
    let mut price: i64 = 0;
    let mut category_id: Option<i64> = None;
    let mut text_content: Option<String> = None;
    let mut status_name: Option<String> = None;
    let mut source_link: Option<String> = None;
    let mut new_duration_name = String::new();
    let mut new_duration_seconds: Option<i64> = None;
    let mut new_duration_price: Option<i64> = None;
    let mut new_duration_default = false;
    let mut bundle_items: Vec<i64> = Vec::new();

    for (key, value) in raw_form {
        match key.as_str() {
            "name" => name = value,
            "description" => description = value,
            "price" => {
                if let Ok(v) = value.parse() {
                    price = v;
                }
            }
            "category_id" => category_id = value.parse().ok(),
            "text_content" => text_content = Some(value),
            "status_name" => status_name = Some(value),
            "source_link" => source_link = Some(value),
            "new_duration_name" => new_duration_name = value,
            "new_duration_seconds" => new_duration_seconds = value.parse().ok(),
            "new_duration_price" => new_duration_price = value.parse().ok(),
            "new_duration_default" => new_duration_default = value == "on",
            "bundle_items" => {
                if let Ok(v) = value.parse() {
                    bundle_items.push(v);
                }
            }
            _ => {}
        }
    }

    if name.trim().is_empty() {
        session.flash("error", "Enter a product name");
        let jar = session.persist(&state, jar).await;
        return (
            jar,
            Redirect::to(&format!("/admin/tariffs/{}/edit", tariff_id)),
        )
            .into_response();
    }

    let payload = match tariff.t_type.as_str() {
        tariff_type::TEXT => text_content,
        tariff_type::CHANNEL => source_link,
        _ => None,
    };
    let status_name = if tariff.t_type == tariff_type::STATUS {
        status_name
    } else {
        None
    };

    if let Err(e) = state
        .tariffs
        .update(
            tariff_id,
            &name,
            &description,
            price,
            category_id,
            payload.as_deref(),
            status_name.as_deref(),
        )
        .await
    {
        error!("tariff update failed: {:#}", e);
        session.flash("error", "Could not save the product");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/tariffs")).into_response();
    }

    // A filled-in duration row on the edit form adds a new duration.
    if tariff.t_type != tariff_type::BUNDLE && !new_duration_name.trim().is_empty() {
        if let (Some(seconds), Some(dur_price)) = (new_duration_seconds, new_duration_price) {
            if let Err(e) = state
                .tariffs
                .add_duration(
                    tariff_id,
                    &new_duration_name,
                    seconds,
                    dur_price,
                    new_duration_default,
                )
                .await
            {
                error!("duration add failed: {:#}", e);
                session.flash("error", "Could not add the duration");
            }
        }
    }

    if tariff.t_type == tariff_type::BUNDLE {
        if let Err(e) = state.tariffs.set_bundle_items(tariff_id, &bundle_items).await {
            error!("bundle update failed: {:#}", e);
            session.flash("error", "Could not update the bundle contents");
        }
    }

    session.flash("success", "Saved");
    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/admin/tariffs")).into_response()
}

pub async fn delete(
    State(state): State<AppState>,
    Path(tariff_id): Path<i64>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    match state.tariffs.delete(tariff_id).await {
        Ok(()) => session.flash("success", "Deleted"),
        Err(e) => {
            error!("tariff delete failed: {:#}", e);
            session.flash("error", "Could not delete the product");
        }
    }

    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/admin/tariffs")).into_response()
}

pub async fn delete_duration(
    State(state): State<AppState>,
    Path((tariff_id, duration_id)): Path<(i64, i64)>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    match state.tariffs.delete_duration(duration_id).await {
        Ok(()) => session.flash("success", "Duration removed"),
        Err(e) => {
            error!("duration delete failed: {:#}", e);
            session.flash("error", "Could not remove the duration");
        }
    }

    let jar = session.persist(&state, jar).await;
    (
        jar,
        Redirect::to(&format!("/admin/tariffs/{}/edit", tariff_id)),
    )
        .into_response()
}
