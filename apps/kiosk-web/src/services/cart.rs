use serde::{Deserialize, Serialize};
use tracing::warn;

use kiosk_db::models::catalog::{Tariff, TariffDuration, tariff_type};

use crate::session::CartLine;
use crate::state::AppState;

/// A cart line resolved against the current catalog. Prices here are
/// whatever the catalog says right now, not what it said when the line
/// was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemView {
    pub tariff_id: i64,
    pub name: String,
    pub t_type: String,
    pub price: i64,
    pub quantity: i64,
    pub subtotal: i64,
    pub duration_seconds: i64,
    pub duration_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EnrichedCart {
    pub items: Vec<CartItemView>,
    pub total: i64,
}

/// Resolves one line. A matching duration's price overrides the tariff
/// base price; a vanished tariff drops the line.
pub fn resolve_line(
    line: &CartLine,
    tariff: &Tariff,
    durations: &[TariffDuration],
) -> CartItemView {
    let mut price = tariff.price;
    let mut duration_name = None;
    if line.duration_seconds > 0 {
        if let Some(d) = durations.iter().find(|d| d.seconds == line.duration_seconds) {
            price = d.price;
            duration_name = Some(d.name.clone());
        }
    }
    CartItemView {
        tariff_id: tariff.id,
        name: tariff.name.clone(),
        t_type: tariff.t_type.clone(),
        price,
        quantity: line.quantity,
        subtotal: price * line.quantity,
        duration_seconds: line.duration_seconds,
        duration_name,
    }
}

pub async fn enrich(state: &AppState, lines: &[CartLine]) -> EnrichedCart {
    let mut cart = EnrichedCart::default();
    for line in lines {
        let tariff = match state.tariffs.get(line.tariff_id).await {
            Ok(Some(t)) => t,
            Ok(None) => continue,
            Err(e) => {
                warn!("cart enrichment skipped tariff {}: {:#}", line.tariff_id, e);
                continue;
            }
        };
        let durations = if line.duration_seconds > 0 {
            state.tariffs.durations(tariff.id).await.unwrap_or_default()
        } else {
            Vec::new()
        };
        let item = resolve_line(line, &tariff, &durations);
        cart.total += item.subtotal;
        cart.items.push(item);
    }
    cart
}

/// Channel access (and bundles, which may contain channels) is granted by
/// Telegram id, so those carts cannot be checked out anonymously.
pub fn requires_login(items: &[CartItemView]) -> bool {
    items
        .iter()
        .any(|it| it.t_type == tariff_type::CHANNEL || it.t_type == tariff_type::BUNDLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tariff(id: i64, t_type: &str, price: i64) -> Tariff {
        Tariff {
            id,
            name: format!("tariff-{}", id),
            description: String::new(),
            price,
            t_type: t_type.to_string(),
            payload: String::new(),
            status_name: None,
            category_id: None,
        }
    }

    fn duration(tariff_id: i64, seconds: i64, price: i64) -> TariffDuration {
        TariffDuration {
            id: seconds,
            tariff_id,
            name: format!("{}s", seconds),
            seconds,
            price,
            is_default: false,
        }
    }

    #[test]
    fn duration_price_overrides_base_price() {
        let line = CartLine {
            tariff_id: 1,
            duration_seconds: 3600,
            quantity: 1,
        };
        let t = tariff(1, "channel", 500);
        let item = resolve_line(&line, &t, &[duration(1, 3600, 300)]);
        assert_eq!(item.price, 300);
        assert_eq!(item.subtotal, 300);
        assert_eq!(item.duration_name.as_deref(), Some("3600s"));
    }

    #[test]
    fn unknown_duration_falls_back_to_base_price() {
        let line = CartLine {
            tariff_id: 1,
            duration_seconds: 60,
            quantity: 1,
        };
        let t = tariff(1, "channel", 500);
        let item = resolve_line(&line, &t, &[duration(1, 3600, 300)]);
        assert_eq!(item.price, 500);
        assert!(item.duration_name.is_none());
    }

    #[test]
    fn subtotal_scales_with_quantity() {
        let line = CartLine {
            tariff_id: 1,
            duration_seconds: 0,
            quantity: 3,
        };
        let t = tariff(1, "text", 150);
        let item = resolve_line(&line, &t, &[]);
        assert_eq!(item.subtotal, 450);
    }

    #[test]
    fn channel_and_bundle_carts_require_login() {
        let line = CartLine {
            tariff_id: 1,
            duration_seconds: 0,
            quantity: 1,
        };
        let text = resolve_line(&line, &tariff(1, "text", 100), &[]);
        let status = resolve_line(&line, &tariff(2, "status", 100), &[]);
        let channel = resolve_line(&line, &tariff(3, "channel", 100), &[]);
        let bundle = resolve_line(&line, &tariff(4, "bundle", 100), &[]);

        assert!(!requires_login(&[text.clone(), status.clone()]));
        assert!(requires_login(&[text, channel]));
        assert!(requires_login(&[status, bundle]));
        assert!(!requires_login(&[]));
    }
}
