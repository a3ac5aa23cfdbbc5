use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Form, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;

use kiosk_db::models::catalog::Category;

use crate::handlers::admin::is_admin;
use crate::handlers::{PageCtx, page_ctx};
use crate::session::Session;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "admin_categories.html")]
struct CategoriesTemplate {
    ctx: PageCtx,
    categories: Vec<CategoryRow>,
    uncategorized_count: usize,
}

struct CategoryRow {
    id: i64,
    name: String,
    description: String,
    subcategories: Vec<Category>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin_category_edit.html")]
struct CategoryEditTemplate {
    ctx: PageCtx,
    editing: bool,
    cat_id: i64,
    name: String,
    description: String,
    parents: Vec<ParentOption>,
}

pub struct ParentOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

#[derive(Deserialize)]
pub struct CategoryForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<String>,
}

fn parse_parent(raw: &Option<String>) -> Option<i64> {
    raw.as_deref().and_then(|v| v.parse::<i64>().ok())
}

pub async fn list(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let mut categories = Vec::new();
    for cat in state.categories.roots().await.unwrap_or_default() {
        let subcategories = state.categories.children(cat.id).await.unwrap_or_default();
        categories.push(CategoryRow {
            id: cat.id,
            name: cat.name,
            description: cat.description,
            subcategories,
        });
    }
    let uncategorized_count = state
        .tariffs
        .list_uncategorized()
        .await
        .unwrap_or_default()
        .len();

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        CategoriesTemplate {
            ctx,
            categories,
            uncategorized_count,
        },
    )
        .into_response()
}

pub async fn new_form(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let parents = state
        .categories
        .roots()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|c| ParentOption {
            id: c.id,
            name: c.name,
            selected: false,
        })
        .collect();

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        CategoryEditTemplate {
            ctx,
            editing: false,
            cat_id: 0,
            name: String::new(),
            description: String::new(),
            parents,
        },
    )
        .into_response()
}

pub async fn create(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CategoryForm>,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let name = form.name.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        session.flash("error", "Enter a category name");
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/categories/new")).into_response();
    }
    let description = form.description.unwrap_or_default();
    let parent_id = parse_parent(&form.parent_id);

    match state.categories.create(&name, &description, parent_id).await {
        Ok(_) => session.flash("success", "Category created"),
        Err(e) => {
            error!("category create failed: {:#}", e);
            session.flash("error", "Could not create the category");
        }
    }

    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/admin/categories")).into_response()
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(cat_id): Path<i64>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let cat = match state.categories.get(cat_id).await {
        Ok(Some(c)) => c,
        Ok(None) | Err(_) => {
            session.flash("error", "Category not found");
            let jar = session.persist(&state, jar).await;
            return (jar, Redirect::to("/admin/categories")).into_response();
        }
    };

    let parents = state
        .categories
        .roots()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|c| c.id != cat_id)
        .map(|c| ParentOption {
            selected: cat.parent_id == Some(c.id),
            id: c.id,
            name: c.name,
        })
        .collect();

    let ctx = page_ctx(&state, &mut session);
    let jar = session.persist(&state, jar).await;
    (
        jar,
        CategoryEditTemplate {
            ctx,
            editing: true,
            cat_id,
            name: cat.name,
            description: cat.description,
            parents,
        },
    )
        .into_response()
}

pub async fn update(
    State(state): State<AppState>,
    Path(cat_id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<CategoryForm>,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    let name = form.name.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        session.flash("error", "Enter a category name");
        let jar = session.persist(&state, jar).await;
        return (
            jar,
            Redirect::to(&format!("/admin/categories/{}/edit", cat_id)),
        )
            .into_response();
    }
    let description = form.description.unwrap_or_default();
    let parent_id = parse_parent(&form.parent_id);

    // A category must never become its own ancestor.
    match state.categories.would_create_cycle(cat_id, parent_id).await {
        Ok(false) => {}
        Ok(true) => {
            session.flash("error", "That parent would create a category cycle");
            let jar = session.persist(&state, jar).await;
            return (
                jar,
                Redirect::to(&format!("/admin/categories/{}/edit", cat_id)),
            )
                .into_response();
        }
        Err(e) => {
            error!("cycle check failed: {:#}", e);
            session.flash("error", "Could not save the category");
            let jar = session.persist(&state, jar).await;
            return (jar, Redirect::to("/admin/categories")).into_response();
        }
    }

    match state
        .categories
        .update(cat_id, &name, &description, parent_id)
        .await
    {
        Ok(()) => session.flash("success", "Saved"),
        Err(e) => {
            error!("category update failed: {:#}", e);
            session.flash("error", "Could not save the category");
        }
    }

    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/admin/categories")).into_response()
}

pub async fn delete(
    State(state): State<AppState>,
    Path(cat_id): Path<i64>,
    jar: CookieJar,
) -> Response {
    let mut session = Session::load(&state, &jar).await;
    if !is_admin(&state, &session) {
        let jar = session.persist(&state, jar).await;
        return (jar, Redirect::to("/admin/login_info")).into_response();
    }

    match state.categories.delete(cat_id).await {
        Ok(()) => session.flash("success", "Deleted"),
        Err(e) => {
            error!("category delete failed: {:#}", e);
            session.flash("error", "Could not delete the category");
        }
    }

    let jar = session.persist(&state, jar).await;
    (jar, Redirect::to("/admin/categories")).into_response()
}
