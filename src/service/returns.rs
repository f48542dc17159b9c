//! Reverse-shipment booking for an order, at most once per order.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::Caller;
use crate::courier::{book_reverse_shipment, remarks, PayloadContext, ReversePayload};
use crate::domain::aggregates::{Order, PickupOverride, ReturnBooking, ReturnTracking};
use crate::domain::value_objects::deserialize_text;
use crate::store::{order_path, user_order_path};
use crate::{AppState, BackofficeError, Result, SideEffect};

use super::deserialize_trimmed;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateReturnRequest {
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, message = "orderId is required"))]
    pub order_id: String,
    #[serde(deserialize_with = "crate::domain::value_objects::deserialize_or_default")]
    pub pickup: PickupRequest,
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub reason: String,
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub notes: String,
}

/// Pickup address as typed by the admin; the postal code may come as `zip`,
/// `pincode` or `pin`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PickupRequest {
    #[serde(deserialize_with = "deserialize_text")] pub name: String,
    #[serde(deserialize_with = "deserialize_text")] pub phone: String,
    #[serde(deserialize_with = "deserialize_text")] pub address: String,
    #[serde(deserialize_with = "deserialize_text")] pub city: String,
    #[serde(deserialize_with = "deserialize_text")] pub state: String,
    #[serde(deserialize_with = "deserialize_text")] pub zip: String,
    #[serde(deserialize_with = "deserialize_text")] pub pincode: String,
    #[serde(deserialize_with = "deserialize_text")] pub pin: String,
}

impl PickupRequest {
    pub fn to_override(&self) -> Option<PickupOverride> {
        let zip = [&self.zip, &self.pincode, &self.pin].into_iter().find(|z| !z.trim().is_empty()).map_or("", |z| z.as_str());
        PickupOverride::from_fields(&self.name, &self.phone, &self.address, &self.city, &self.state, zip)
    }
}

fn non_empty(s: &str) -> Option<String> { Some(s.to_string()).filter(|s| !s.is_empty()) }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReturnOutcome {
    pub ok: bool,
    /// The order already had a return; nothing was sent to the courier.
    pub already: bool,
    pub awb: Option<String>,
    pub shipment_id: Option<String>,
    pub side_effects: Vec<SideEffect>,
}

impl CreateReturnOutcome {
    fn existing(t: ReturnTracking) -> Self {
        Self { ok: true, already: true, awb: t.awb, shipment_id: t.shipment_id, side_effects: vec![] }
    }
}

async fn load_order(state: &AppState, order_id: &str) -> Result<Order> {
    let doc = state.store.get(&order_path(order_id)).await?
        .ok_or_else(|| BackofficeError::NotFound("Order not found".into()))?;
    Ok(Order::from_document(order_id, doc)?)
}

pub async fn create_return(state: &AppState, caller: &Caller, req: CreateReturnRequest) -> Result<CreateReturnOutcome> {
    caller.require_admin()?;
    req.validate()?;
    let mut order = load_order(state, &req.order_id).await?;

    if let Some(existing) = order.return_tracking() {
        tracing::info!(order_id = %req.order_id, awb = ?existing.awb, "return already booked");
        return Ok(CreateReturnOutcome::existing(existing));
    }
    if !state.config.courier.has_credentials() {
        return Err(BackofficeError::FailedPrecondition("Courier not configured".into()));
    }

    let pickup = req.pickup.to_override();
    let ctx = PayloadContext { package: state.config.courier.package(), warehouse: &state.config.warehouse };
    let payload = ReversePayload::build(ctx, &order, pickup.as_ref(), remarks(Some(&req.reason), Some(&req.notes)));
    let booked = book_reverse_shipment(state.courier.as_ref(), &payload).await?;

    let booking = ReturnBooking {
        tracking: ReturnTracking { awb: booked.awb, shipment_id: booked.shipment_id },
        raw: booked.raw,
        reason: non_empty(&req.reason),
        notes: non_empty(&req.notes),
        pickup,
    };
    order.record_return(&booking)?;
    let now = Utc::now();
    if let Err(e) = state.store.merge(&order_path(order.id()), booking.order_patch(now)).await {
        let (awb, shipment_id) = (&booking.tracking.awb, &booking.tracking.shipment_id);
        tracing::error!(order_id = %order.id(), ?awb, ?shipment_id, error = %e, "reverse shipment booked but order update failed");
        return Err(BackofficeError::Internal(format!(
            "Shipment booked (awb {}, shipment {}) but the order was not updated: {e}",
            awb.as_deref().unwrap_or("-"), shipment_id.as_deref().unwrap_or("-"),
        )));
    }

    let mirror = match order.owner() {
        Some(uid) => SideEffect::from_result("user_order_mirror", state.store.merge(&user_order_path(uid, order.id()), booking.mirror_patch(now)).await),
        None => SideEffect::skipped("user_order_mirror", "order has no owner"),
    };
    for event in order.take_events() {
        tracing::info!(?event, actor = %caller.actor(), "reverse shipment booked");
    }

    Ok(CreateReturnOutcome {
        ok: true,
        already: false,
        awb: booking.tracking.awb,
        shipment_id: booking.tracking.shipment_id,
        side_effects: vec![mirror],
    })
}

/// Whether the order already has a reverse shipment, for the admin panel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStatus { pub requested: bool, pub awb: Option<String>, pub shipment_id: Option<String> }

pub async fn return_status(state: &AppState, caller: &Caller, order_id: &str) -> Result<ReturnStatus> {
    caller.require_admin()?;
    let order_id = order_id.trim();
    if order_id.is_empty() { return Err(BackofficeError::InvalidArgument("orderId is required".into())); }
    let order = load_order(state, order_id).await?;
    Ok(match order.return_tracking() {
        Some(t) => ReturnStatus { requested: true, awb: t.awb, shipment_id: t.shipment_id },
        None => ReturnStatus { requested: false, awb: None, shipment_id: None },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courier::fake::FakeCourier;
    use crate::service::testing::{admin, customer, state_with};
    use crate::store::{DocumentStore, InMemoryStore, StoreError};
    use crate::SideEffectOutcome;
    use serde_json::json;
    use std::sync::Arc;

    fn req(order_id: &str) -> CreateReturnRequest {
        serde_json::from_value(json!({
            "orderId": order_id,
            "pickup": {"name": "Asha", "phone": "9876543210", "pincode": "110087-extra"},
            "reason": "refund-approved",
            "notes": "Created from admin Refunds page",
        })).unwrap()
    }

    async fn seeded() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert("orders/ord123xyz", json!({
            "userId": "u1", "amount": 1000,
            "billing": {"name": "Asha", "address": "12 Lake Road, Pune"},
            "items": [{"name": "Sneaker", "qty": 1, "price": 1000, "id": "P1"}],
        })).await;
        store
    }

    #[tokio::test]
    async fn test_books_once_then_returns_existing() {
        let store = seeded().await;
        let courier = Arc::new(FakeCourier::replying(vec![(200, json!({"data": {"awb_number": "AWB1", "shipment_id": 42}}))]));
        let state = state_with(store.clone(), courier.clone(), Default::default());

        let first = create_return(&state, &admin(), req("ord123xyz")).await.unwrap();
        assert!(!first.already);
        assert_eq!(first.awb.as_deref(), Some("AWB1"));
        assert_eq!(first.shipment_id.as_deref(), Some("42"));
        assert!(first.side_effects[0].is_applied());

        let second = create_return(&state, &admin(), req("ord123xyz")).await.unwrap();
        assert!(second.already);
        assert_eq!(second.awb.as_deref(), Some("AWB1"));
        assert_eq!(second.shipment_id.as_deref(), Some("42"));
        assert_eq!(courier.submission_count(), 1);
        assert_eq!(courier.login_count(), 1);

        let order = store.get("orders/ord123xyz").await.unwrap().unwrap();
        assert_eq!(order["returnRequested"], true);
        assert_eq!(order["returnReason"], "refund-approved");
        assert_eq!(order["returnPickup"]["zip"], "110087-extra");
        assert_eq!(order["returnRaw"]["data"]["awb_number"], "AWB1");
        let mirror = store.get("users/u1/orders/ord123xyz").await.unwrap().unwrap();
        assert_eq!(mirror["returnAwb"], "AWB1");
        assert!(mirror.get("returnRaw").is_none());

        let (_, payload) = courier.submissions.lock().unwrap()[0].clone();
        assert_eq!(payload.order_number, "RETORD123");
        assert_eq!(payload.pickup.pincode.as_str(), "110087");
        assert_eq!(payload.pickup.address, "12 Lake Road, Pune");
        assert_eq!(payload.remarks.as_deref(), Some("refund-approved | Created from admin Refunds page"));
    }

    #[tokio::test]
    async fn test_guards_run_before_the_courier() {
        let store = seeded().await;
        let courier = Arc::new(FakeCourier::default());
        let state = state_with(store, courier.clone(), Default::default());

        let err = create_return(&state, &customer("u1"), req("ord123xyz")).await.unwrap_err();
        assert_eq!(err.kind(), "permission-denied");
        let err = create_return(&state, &admin(), req("  ")).await.unwrap_err();
        assert_eq!(err.to_string(), "orderId is required");
        let err = create_return(&state, &admin(), req("missing")).await.unwrap_err();
        assert_eq!(err.kind(), "not-found");
        assert_eq!(courier.login_count(), 0);
    }

    #[tokio::test]
    async fn test_requires_courier_credentials() {
        let store = seeded().await;
        let courier = Arc::new(FakeCourier::default());
        let mut state = state_with(store, courier.clone(), Default::default());
        let mut cfg = (*state.config).clone();
        cfg.courier.username.clear();
        state.config = Arc::new(cfg);
        let err = create_return(&state, &admin(), req("ord123xyz")).await.unwrap_err();
        assert_eq!(err.kind(), "failed-precondition");
        assert_eq!(courier.login_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_leaves_order_untouched() {
        let store = seeded().await;
        let courier = Arc::new(FakeCourier::replying(vec![(400, json!({"message": "Invalid pincode"}))]));
        let state = state_with(store.clone(), courier, Default::default());
        let err = create_return(&state, &admin(), req("ord123xyz")).await.unwrap_err();
        assert_eq!(err.kind(), "upstream");
        assert_eq!(err.to_string(), "Invalid pincode");
        assert!(store.get("orders/ord123xyz").await.unwrap().unwrap().get("returnRequested").is_none());
    }

    /// Reads from the seeded store, refuses every write.
    struct ReadOnlyStore(Arc<InMemoryStore>);

    #[async_trait::async_trait]
    impl DocumentStore for ReadOnlyStore {
        async fn get(&self, path: &str) -> std::result::Result<Option<serde_json::Value>, StoreError> { self.0.get(path).await }
        async fn merge(&self, path: &str, _: serde_json::Value) -> std::result::Result<(), StoreError> { Err(StoreError::NotAnObject(path.into())) }
    }

    #[tokio::test]
    async fn test_failed_order_write_reports_booked_ids() {
        let courier = Arc::new(FakeCourier::replying(vec![(200, json!({"awb_number": "AWB7", "shipment_id": "S7"}))]));
        let state = AppState {
            config: Arc::new(crate::service::testing::config()),
            store: Arc::new(ReadOnlyStore(seeded().await)),
            courier: courier.clone(),
            notifier: Arc::new(crate::messaging::fake::FakeNotifier::default()),
        };
        let err = create_return(&state, &admin(), req("ord123xyz")).await.unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert!(err.to_string().contains("awb AWB7, shipment S7"));
        assert_eq!(courier.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_unowned_order_skips_mirror() {
        let store = Arc::new(InMemoryStore::new());
        store.insert("orders/o2", json!({"amount": 10})).await;
        let courier = Arc::new(FakeCourier::replying(vec![(200, json!({"awb": "A"}))]));
        let state = state_with(store.clone(), courier, Default::default());
        let out = create_return(&state, &admin(), req("o2")).await.unwrap();
        assert!(matches!(out.side_effects[0].outcome, SideEffectOutcome::Skipped { .. }));
        assert_eq!(store.len().await, 1);

        let status = return_status(&state, &admin(), "o2").await.unwrap();
        assert!(status.requested);
        assert_eq!(status.awb.as_deref(), Some("A"));
    }
}
