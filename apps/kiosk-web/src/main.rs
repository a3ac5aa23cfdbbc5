use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use dotenvy::dotenv;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod handlers;
mod services;
mod session;
mod state;

use config::Config;
use services::redis_service::RedisService;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiosk_web=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Storefront starting...");
    tracing::info!("Site URL: {}", config.site_url);

    let pool = kiosk_db::connect(&config.database_url).await?;
    let redis = RedisService::connect(&config.redis_url).await?;
    let listen_port = config.listen_port;

    let state = AppState::new(pool, config, redis);

    let app = Router::new()
        // Storefront
        .route("/", get(handlers::shop::index))
        .route("/category/{cat_id}", get(handlers::shop::category))
        .route("/product/{tariff_id}", get(handlers::shop::product_detail))
        // Cart
        .route("/add_to_cart", post(handlers::cart::add_to_cart))
        .route("/remove_from_cart", post(handlers::cart::remove_from_cart))
        .route("/cart", get(handlers::cart::view_cart))
        .route("/apply_promo", post(handlers::cart::apply_promo))
        // Checkout & payment polling
        .route("/checkout", post(handlers::checkout::checkout))
        .route("/payment/{payment_id}", get(handlers::checkout::payment_page))
        .route(
            "/api/payment_status/{payment_id}",
            get(handlers::checkout::payment_status),
        )
        // Account
        .route("/account", get(handlers::account::account))
        .route(
            "/refresh_access/{purchase_id}",
            get(handlers::account::refresh_access),
        )
        // Telegram login
        .route("/tg_login", get(handlers::auth::tg_login))
        .route("/logout", get(handlers::auth::logout))
        // Admin panel
        .route("/admin", get(handlers::admin::index))
        .route("/admin/login_info", get(handlers::admin::login_info))
        .route("/admin/categories", get(handlers::admin::categories::list))
        .route(
            "/admin/categories/new",
            get(handlers::admin::categories::new_form).post(handlers::admin::categories::create),
        )
        .route(
            "/admin/categories/{cat_id}/edit",
            get(handlers::admin::categories::edit_form).post(handlers::admin::categories::update),
        )
        .route(
            "/admin/categories/{cat_id}/delete",
            post(handlers::admin::categories::delete),
        )
        .route("/admin/tariffs", get(handlers::admin::tariffs::list))
        .route(
            "/admin/tariffs/new",
            get(handlers::admin::tariffs::new_form).post(handlers::admin::tariffs::create),
        )
        .route(
            "/admin/tariffs/{tariff_id}/edit",
            get(handlers::admin::tariffs::edit_form).post(handlers::admin::tariffs::update),
        )
        .route(
            "/admin/tariffs/{tariff_id}/delete",
            post(handlers::admin::tariffs::delete),
        )
        .route(
            "/admin/tariffs/{tariff_id}/durations/{duration_id}/delete",
            post(handlers::admin::tariffs::delete_duration),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], listen_port));
    tracing::info!("Storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
