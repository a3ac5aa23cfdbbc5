use std::collections::HashMap;

use anyhow::Result;
use tracing::{info, warn};
use uuid::Uuid;

use kiosk_db::models::catalog::{Channel, Tariff, tariff_type};

use crate::services::pending::PendingOrder;
use crate::session::GuestGrant;
use crate::state::AppState;

/// Delivers a claimed order: expands bundles, grants each line per tariff
/// type, records the idempotency marker and spends the promo use. Returns
/// the grants accumulated for a guest buyer (empty for logged-in users).
///
/// Individual line failures degrade to warnings; a half-delivered order
/// is preferable to a paid order delivering nothing.
pub async fn deliver_order(
    state: &AppState,
    payment_id: &str,
    order: &PendingOrder,
) -> Result<Vec<GuestGrant>> {
    if let Some(tg_id) = order.user_id {
        // The unique insert is the authoritative claim: losing it means
        // another poll (or a previous process run) already delivered.
        let claimed = state
            .payments
            .insert_once(payment_id, tg_id, 0, order.total)
            .await?;
        if !claimed {
            info!("payment {} already processed, skipping delivery", payment_id);
            return Ok(Vec::new());
        }
    }

    let channels = match state.tariffs.channels_map().await {
        Ok(map) => map,
        Err(e) => {
            warn!("channel map unavailable during delivery: {:#}", e);
            HashMap::new()
        }
    };

    let mut grants = Vec::new();
    for item in &order.items {
        let tariff = match state.tariffs.get(item.tariff_id).await {
            Ok(Some(t)) => t,
            Ok(None) => continue,
            Err(e) => {
                warn!("delivery skipped tariff {}: {:#}", item.tariff_id, e);
                continue;
            }
        };
        let line_price = item.price * item.quantity;
        if tariff.t_type == tariff_type::BUNDLE {
            // The bundle price was charged once; children are granted at
            // zero incremental price, each at the parent line's duration.
            let children = match state.tariffs.bundle_items(tariff.id).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("bundle {} items unavailable: {:#}", tariff.id, e);
                    continue;
                }
            };
            for child_id in children {
                match state.tariffs.get(child_id).await {
                    Ok(Some(child)) => {
                        deliver_single(
                            state,
                            order.user_id,
                            &child,
                            0,
                            item.duration_seconds,
                            payment_id,
                            &channels,
                            &mut grants,
                        )
                        .await;
                    }
                    Ok(None) => {}
                    Err(e) => warn!("delivery skipped bundle child {}: {:#}", child_id, e),
                }
            }
        } else {
            deliver_single(
                state,
                order.user_id,
                &tariff,
                line_price,
                item.duration_seconds,
                payment_id,
                &channels,
                &mut grants,
            )
            .await;
        }
    }

    if let Some(code) = &order.promo_code {
        if let Err(e) = state.promos.decrement_use(code).await {
            warn!("promo use decrement failed for {}: {:#}", code, e);
        }
    }

    Ok(grants)
}

#[allow(clippy::too_many_arguments)]
async fn deliver_single(
    state: &AppState,
    user_id: Option<i64>,
    tariff: &Tariff,
    price: i64,
    duration: i64,
    payment_id: &str,
    channels: &HashMap<i64, Channel>,
    grants: &mut Vec<GuestGrant>,
) {
    match tariff.t_type.as_str() {
        tariff_type::TEXT => {
            let content = tariff.payload.clone();
            match user_id {
                Some(tg_id) => {
                    if let Err(e) = state
                        .purchases
                        .upsert(tg_id, tariff.id, price, &content, Some(0), None, payment_id)
                        .await
                    {
                        warn!("text grant failed for tariff {}: {:#}", tariff.id, e);
                    }
                }
                None => grants.push(GuestGrant {
                    name: tariff.name.clone(),
                    kind: tariff_type::TEXT.to_string(),
                    content,
                }),
            }
        }
        tariff_type::STATUS => {
            let code = status_code();
            let link = if state.config.status_bot_link.is_empty() {
                code
            } else {
                format!("{}?start={}", state.config.status_bot_link, code)
            };
            match user_id {
                Some(tg_id) => {
                    if let Err(e) = state
                        .purchases
                        .upsert(tg_id, tariff.id, price, &link, Some(0), None, payment_id)
                        .await
                    {
                        warn!("status grant failed for tariff {}: {:#}", tariff.id, e);
                    }
                }
                None => grants.push(GuestGrant {
                    name: tariff.name.clone(),
                    kind: tariff_type::STATUS.to_string(),
                    content: link,
                }),
            }
        }
        _ => {
            // Channel access needs an invite link and a Telegram id; the
            // checkout guard keeps guests out of this arm.
            let Some(tg_id) = user_id else {
                return;
            };
            let channel_ids = match state.tariffs.channel_ids(tariff.id).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("channels unavailable for tariff {}: {:#}", tariff.id, e);
                    return;
                }
            };
            let Some((channel_id, invite_link)) = first_invite(&channel_ids, channels) else {
                warn!("no invite link bound to tariff {}", tariff.id);
                return;
            };
            let ttl = grant_ttl(&tariff.t_type, duration);
            if let Err(e) = state
                .purchases
                .upsert(
                    tg_id,
                    tariff.id,
                    price,
                    &invite_link,
                    ttl,
                    Some(channel_id),
                    payment_id,
                )
                .await
            {
                warn!("channel grant failed for tariff {}: {:#}", tariff.id, e);
                return;
            }
            set_auto_approve(state, channel_id, tg_id, ttl).await;
        }
    }
}

/// TTL recorded with a grant. Text and status grants never expire on their
/// own (the countdown is "none"); a channel grant runs for the purchased
/// duration, or indefinitely when no duration was chosen.
pub fn grant_ttl(t_type: &str, duration: i64) -> Option<i64> {
    match t_type {
        tariff_type::TEXT | tariff_type::STATUS => Some(0),
        _ => {
            if duration > 0 {
                Some(duration)
            } else {
                None
            }
        }
    }
}

/// First bound channel carrying a non-empty invite link, in store order.
pub fn first_invite(
    channel_ids: &[i64],
    channels: &HashMap<i64, Channel>,
) -> Option<(i64, String)> {
    for id in channel_ids {
        if let Some(channel) = channels.get(id) {
            if let Some(link) = channel.invite_link.as_deref() {
                if !link.is_empty() {
                    return Some((*id, link.to_string()));
                }
            }
        }
    }
    None
}

/// Registers the buyer for auto-approval of their channel join request.
/// The key is read by an external bot process; failures are logged and
/// never block delivery.
pub async fn set_auto_approve(state: &AppState, channel_id: i64, tg_id: i64, ttl: Option<i64>) {
    let key = format!("auto:{}:{}", channel_id, tg_id);
    let result = match ttl {
        None => state.redis.set(&key, "1", None).await,
        Some(t) if t > 0 => state.redis.set(&key, "1", Some(t as u64)).await,
        Some(_) => return,
    };
    if let Err(e) = result {
        warn!("auto-approve registration failed for {}: {:#}", key, e);
    }
}

fn status_code() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: i64, invite_link: Option<&str>) -> Channel {
        Channel {
            id,
            title: format!("channel-{}", id),
            invite_link: invite_link.map(str::to_string),
        }
    }

    #[test]
    fn first_invite_skips_linkless_channels() {
        let mut map = HashMap::new();
        map.insert(1, channel(1, None));
        map.insert(2, channel(2, Some("")));
        map.insert(3, channel(3, Some("https://t.me/+abc")));

        assert_eq!(
            first_invite(&[1, 2, 3], &map),
            Some((3, "https://t.me/+abc".to_string()))
        );
    }

    #[test]
    fn first_invite_respects_binding_order() {
        let mut map = HashMap::new();
        map.insert(1, channel(1, Some("https://t.me/+one")));
        map.insert(2, channel(2, Some("https://t.me/+two")));

        assert_eq!(
            first_invite(&[2, 1], &map),
            Some((2, "https://t.me/+two".to_string()))
        );
    }

    #[test]
    fn first_invite_handles_unknown_and_empty() {
        let map = HashMap::new();
        assert_eq!(first_invite(&[7, 8], &map), None);
        assert_eq!(first_invite(&[], &map), None);
    }

    #[test]
    fn grant_ttl_maps_types() {
        assert_eq!(grant_ttl("text", 3600), Some(0));
        assert_eq!(grant_ttl("status", 3600), Some(0));
        assert_eq!(grant_ttl("channel", 3600), Some(3600));
        assert_eq!(grant_ttl("channel", 0), None);
        assert_eq!(grant_ttl("vip", 60), Some(60));
    }

    #[test]
    fn status_codes_are_eight_chars() {
        let code = status_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
