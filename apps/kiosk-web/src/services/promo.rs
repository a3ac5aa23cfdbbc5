use kiosk_db::models::promo::{Promocode, discount_type};

use crate::services::cart::CartItemView;

/// Single applicability + discount computation, shared by the cart preview
/// and the authoritative checkout pass so the two can never drift.
///
/// Returns the discount in minor units, or None when the code does not
/// apply: bound to a tariff missing from the cart, exhausted, or the buyer
/// already has an active purchase (promos are first-purchase-only).
pub fn evaluate_promo(
    items: &[CartItemView],
    total: i64,
    has_active_purchase: bool,
    promo: &Promocode,
) -> Option<i64> {
    if let Some(bound) = promo.bound_tariff_id {
        if !items.iter().any(|it| it.tariff_id == bound) {
            return None;
        }
    }

    if has_active_purchase {
        return None;
    }

    if matches!(promo.uses_left, Some(left) if left <= 0) {
        return None;
    }

    let mut discount = if promo.discount_type == discount_type::PERCENT {
        total * promo.discount_value / 100
    } else {
        promo.discount_value
    };

    if let Some(cap) = promo.max_discount {
        discount = discount.min(cap);
    }

    Some(discount.clamp(0, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(tariff_id: i64, subtotal: i64) -> CartItemView {
        CartItemView {
            tariff_id,
            name: String::new(),
            t_type: "text".to_string(),
            price: subtotal,
            quantity: 1,
            subtotal,
            duration_seconds: 0,
            duration_name: None,
        }
    }

    fn promo(discount_type: &str, value: i64) -> Promocode {
        Promocode {
            code: "SALE".to_string(),
            discount_type: discount_type.to_string(),
            discount_value: value,
            max_discount: None,
            uses_left: None,
            bound_tariff_id: None,
        }
    }

    #[test]
    fn percent_discount_floors() {
        let items = [item(1, 999)];
        let p = promo("percent", 10);
        assert_eq!(evaluate_promo(&items, 999, false, &p), Some(99));
    }

    #[test]
    fn flat_discount_capped_by_max_and_total() {
        let items = [item(1, 100)];
        let mut p = promo("flat", 500);
        assert_eq!(evaluate_promo(&items, 100, false, &p), Some(100));

        p.max_discount = Some(40);
        assert_eq!(evaluate_promo(&items, 100, false, &p), Some(40));
    }

    #[test]
    fn percent_discount_respects_cap() {
        let items = [item(1, 10_000)];
        let mut p = promo("percent", 50);
        p.max_discount = Some(1_000);
        assert_eq!(evaluate_promo(&items, 10_000, false, &p), Some(1_000));
    }

    #[test]
    fn bound_tariff_must_be_in_cart() {
        let items = [item(7, 100)];
        let mut p = promo("flat", 10);
        p.bound_tariff_id = Some(8);
        assert_eq!(evaluate_promo(&items, 100, false, &p), None);

        p.bound_tariff_id = Some(7);
        assert_eq!(evaluate_promo(&items, 100, false, &p), Some(10));
    }

    #[test]
    fn active_purchase_history_disqualifies() {
        let items = [item(1, 100)];
        let p = promo("flat", 10);
        assert_eq!(evaluate_promo(&items, 100, true, &p), None);
    }

    #[test]
    fn exhausted_code_does_not_apply() {
        let items = [item(1, 100)];
        let mut p = promo("flat", 10);
        p.uses_left = Some(0);
        assert_eq!(evaluate_promo(&items, 100, false, &p), None);

        p.uses_left = Some(3);
        assert_eq!(evaluate_promo(&items, 100, false, &p), Some(10));
    }
}
