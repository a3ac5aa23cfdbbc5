pub mod cart;
pub mod fulfillment;
pub mod payment;
pub mod pending;
pub mod promo;
pub mod redis_service;
pub mod telegram_auth;
