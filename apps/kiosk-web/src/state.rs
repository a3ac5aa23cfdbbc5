use std::sync::Arc;

use kiosk_db::sqlx::PgPool;

use kiosk_db::repositories::catalog_repo::CatalogRepository;
use kiosk_db::repositories::payment_repo::PaymentRepository;
use kiosk_db::repositories::promo_repo::PromoRepository;
use kiosk_db::repositories::purchase_repo::PurchaseRepository;
use kiosk_db::repositories::tariff_repo::TariffRepository;
use kiosk_db::repositories::user_repo::UserRepository;

use crate::config::Config;
use crate::services::payment::PlategaClient;
use crate::services::pending::PendingOrders;
use crate::services::redis_service::RedisService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub redis: RedisService,
    pub categories: CatalogRepository,
    pub tariffs: TariffRepository,
    pub purchases: PurchaseRepository,
    pub payments: PaymentRepository,
    pub promos: PromoRepository,
    pub users: UserRepository,
    pub gateway: PlategaClient,
    pub pending: Arc<PendingOrders>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, redis: RedisService) -> Self {
        let gateway = PlategaClient::from_config(&config);
        Self {
            categories: CatalogRepository::new(pool.clone()),
            tariffs: TariffRepository::new(pool.clone()),
            purchases: PurchaseRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool.clone()),
            promos: PromoRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            config: Arc::new(config),
            redis,
            gateway,
            pending: Arc::new(PendingOrders::default()),
        }
    }
}
