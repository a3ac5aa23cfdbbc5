use std::collections::HashMap;
use std::sync::Mutex;

use crate::services::cart::CartItemView;

/// An order awaiting provider confirmation. Lives only in this process:
/// created at checkout, consumed by the status poller, never expired.
/// A restart forgets unconfirmed orders.
#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub user_id: Option<i64>,
    pub items: Vec<CartItemView>,
    pub total: i64,
    pub promo_code: Option<String>,
    pub redirect_url: String,
    pub delivered: bool,
    pub created_at: i64,
}

/// Process-local ledger of pending orders keyed by payment id. The
/// `delivered` flag flips inside the map lock, so out of any number of
/// concurrent status polls observing "confirmed" exactly one wins the
/// claim.
#[derive(Debug, Default)]
pub struct PendingOrders {
    inner: Mutex<HashMap<String, PendingOrder>>,
}

impl PendingOrders {
    pub fn insert(&self, payment_id: String, order: PendingOrder) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(payment_id, order);
    }

    pub fn get(&self, payment_id: &str) -> Option<PendingOrder> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(payment_id).cloned()
    }

    /// Atomically claims the order for delivery. Returns a snapshot only
    /// for the first caller; everyone else gets None.
    pub fn claim(&self, payment_id: &str) -> Option<PendingOrder> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let order = map.get_mut(payment_id)?;
        if order.delivered {
            return None;
        }
        order.delivered = true;
        Some(order.clone())
    }

    /// Rolls a failed claim back so a later poll can retry delivery.
    pub fn release(&self, payment_id: &str) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(order) = map.get_mut(payment_id) {
            order.delivered = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn order() -> PendingOrder {
        PendingOrder {
            user_id: Some(42),
            items: Vec::new(),
            total: 100,
            promo_code: None,
            redirect_url: "https://pay.example/redirect".to_string(),
            delivered: false,
            created_at: 0,
        }
    }

    #[test]
    fn claim_succeeds_once() {
        let pending = PendingOrders::default();
        pending.insert("p1".to_string(), order());

        assert!(pending.claim("p1").is_some());
        assert!(pending.claim("p1").is_none());
        assert!(pending.claim("missing").is_none());
    }

    #[test]
    fn release_reopens_the_claim() {
        let pending = PendingOrders::default();
        pending.insert("p1".to_string(), order());

        assert!(pending.claim("p1").is_some());
        pending.release("p1");
        assert!(pending.claim("p1").is_some());
    }

    #[test]
    fn concurrent_claims_yield_a_single_winner() {
        let pending = Arc::new(PendingOrders::default());
        pending.insert("p1".to_string(), order());
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pending = Arc::clone(&pending);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if pending.claim("p1").is_some() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            let _ = handle.join();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
