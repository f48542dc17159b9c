//! Order Aggregate
//!
//! Orders are written by checkout; the back-office only reads them and adds
//! return-tracking fields once a reverse shipment is booked.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use crate::domain::events::{DomainEvent, ReturnEvent};
use crate::domain::value_objects::{deserialize_each_or_default, deserialize_lenient, deserialize_or_default, deserialize_text, round_half_up, truncate};

/// Tax rate applied when the order carries no explicit gst.
pub const DEFAULT_GST_RATE: f64 = 0.18;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    #[serde(skip)]
    id: String,
    #[serde(deserialize_with = "deserialize_or_default")]
    billing: Billing,
    #[serde(deserialize_with = "deserialize_each_or_default")]
    items: Vec<OrderItem>,
    #[serde(deserialize_with = "deserialize_lenient")]
    amount: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient")]
    discount: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient")]
    gst: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient")]
    payable: Option<f64>,
    #[serde(deserialize_with = "deserialize_text")]
    user_id: String,
    #[serde(deserialize_with = "deserialize_text")]
    payment_id: String,
    #[serde(deserialize_with = "deserialize_or_default")]
    coupon: Coupon,
    created_at: Option<Value>,
    #[serde(deserialize_with = "deserialize_text")]
    return_awb: String,
    #[serde(deserialize_with = "deserialize_text")]
    return_shipment_id: String,
    #[serde(deserialize_with = "deserialize_or_default")]
    return_requested: bool,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Billing {
    #[serde(deserialize_with = "deserialize_text")] pub name: String,
    #[serde(deserialize_with = "deserialize_text")] pub email: String,
    #[serde(deserialize_with = "deserialize_text")] pub phone: String,
    #[serde(deserialize_with = "deserialize_text")] pub address: String,
    #[serde(deserialize_with = "deserialize_text")] pub city: String,
    #[serde(deserialize_with = "deserialize_text")] pub state: String,
    #[serde(deserialize_with = "deserialize_text")] pub zip: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderItem {
    #[serde(deserialize_with = "deserialize_text")] pub id: String,
    #[serde(deserialize_with = "deserialize_text")] pub sku: String,
    #[serde(deserialize_with = "deserialize_text")] pub name: String,
    #[serde(deserialize_with = "deserialize_lenient")] pub qty: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient")] pub price: Option<f64>,
}

impl OrderItem {
    /// Zero or unreadable quantities count as one unit.
    pub fn quantity(&self) -> f64 { self.qty.filter(|q| *q != 0.0).unwrap_or(1.0) }
    pub fn unit_price(&self) -> f64 { self.price.unwrap_or(0.0) }
    pub fn sku_or_id(&self) -> &str { if self.sku.is_empty() { &self.id } else { &self.sku } }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Coupon { #[serde(deserialize_with = "deserialize_text")] pub code: String }

/// Integer totals as sent to the courier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Totals { pub amount: i64, pub discount: i64, pub base: i64, pub gst: i64, pub payable: i64 }

/// Tracking identifiers of an already booked reverse shipment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnTracking { pub awb: Option<String>, pub shipment_id: Option<String> }

/// Pickup-address override supplied by the admin; blank fields are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupOverride {
    #[serde(skip_serializing_if = "Option::is_none")] pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub zip: Option<String>,
}

impl PickupOverride {
    /// `None` when every field is blank.
    pub fn from_fields(name: &str, phone: &str, address: &str, city: &str, state: &str, zip: &str) -> Option<Self> {
        let keep = |s: &str| if s.trim().is_empty() { None } else { Some(s.to_string()) };
        let p = Self { name: keep(name), phone: keep(phone), address: keep(address), city: keep(city), state: keep(state), zip: keep(zip) };
        if p == Self::default() { None } else { Some(p) }
    }
}

/// Everything written back once a reverse shipment is booked.
#[derive(Clone, Debug)]
pub struct ReturnBooking {
    pub tracking: ReturnTracking,
    pub raw: Value,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub pickup: Option<PickupOverride>,
}

impl ReturnBooking {
    fn common(&self, now: &str) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("returnRequested".into(), json!(true));
        m.insert("returnAwb".into(), json!(self.tracking.awb));
        m.insert("returnShipmentId".into(), json!(self.tracking.shipment_id));
        if let Some(r) = &self.reason { m.insert("returnReason".into(), json!(r)); }
        if let Some(n) = &self.notes { m.insert("returnNotes".into(), json!(n)); }
        if let Some(p) = &self.pickup { m.insert("returnPickup".into(), json!(p)); }
        m.insert("updatedAt".into(), json!(now));
        m
    }

    /// Patch merged onto `orders/{id}`.
    pub fn order_patch(&self, now: DateTime<Utc>) -> Value {
        let now = now.to_rfc3339();
        let mut m = self.common(&now);
        m.insert("returnRequestedAt".into(), json!(now));
        m.insert("returnRaw".into(), if self.raw.is_null() { Value::Null } else { self.raw.clone() });
        Value::Object(m)
    }

    /// Patch merged onto the user's mirror copy.
    pub fn mirror_patch(&self, now: DateTime<Utc>) -> Value { Value::Object(self.common(&now.to_rfc3339())) }
}

impl Order {
    pub fn from_document(id: impl Into<String>, doc: Value) -> Result<Self, OrderError> {
        let mut order: Order = serde_json::from_value(doc).map_err(|e| OrderError::Malformed(e.to_string()))?;
        order.id = id.into();
        Ok(order)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn billing(&self) -> &Billing { &self.billing }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn payment_id(&self) -> &str { &self.payment_id }
    pub fn coupon_code(&self) -> Option<&str> { Some(self.coupon.code.as_str()).filter(|c| !c.is_empty()) }

    pub fn owner(&self) -> Option<&str> { Some(self.user_id.trim()).filter(|u| !u.is_empty()) }
    pub fn is_owned_by(&self, uid: &str) -> bool { !uid.is_empty() && self.owner() == Some(uid) }

    /// `RET` + first six characters of the order id.
    pub fn return_label(&self) -> String {
        truncate(&format!("RET{}", truncate(&self.id, 6).to_uppercase()), 20)
    }

    /// Set once a reverse shipment exists; further bookings must not happen.
    /// A booking whose reply carried no ids still counts through `returnRequested`.
    pub fn return_tracking(&self) -> Option<ReturnTracking> {
        let awb = Some(self.return_awb.clone()).filter(|s| !s.is_empty());
        let shipment_id = Some(self.return_shipment_id.clone()).filter(|s| !s.is_empty());
        if awb.is_none() && shipment_id.is_none() && !self.return_requested { return None; }
        Some(ReturnTracking { awb, shipment_id })
    }

    /// Record a freshly booked reverse shipment.
    pub fn record_return(&mut self, booking: &ReturnBooking) -> Result<(), OrderError> {
        if self.return_tracking().is_some() { return Err(OrderError::ReturnAlreadyBooked); }
        self.return_awb = booking.tracking.awb.clone().unwrap_or_default();
        self.return_shipment_id = booking.tracking.shipment_id.clone().unwrap_or_default();
        self.return_requested = true;
        self.raise_event(DomainEvent::Return(ReturnEvent::Booked {
            order_id: self.id.clone(), awb: booking.tracking.awb.clone(), shipment_id: booking.tracking.shipment_id.clone(),
        }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    pub fn totals(&self) -> Totals {
        let amount = round_half_up(self.amount.unwrap_or(0.0));
        let discount = round_half_up(self.discount.unwrap_or(0.0));
        let base = (amount - discount).max(0);
        let gst = match self.gst { Some(g) => round_half_up(g), None => round_half_up(base as f64 * DEFAULT_GST_RATE) };
        let payable = match self.payable.map(round_half_up) { Some(p) if p != 0 => p, _ => base + gst };
        Totals { amount, discount, base, gst, payable }
    }

    /// Subtotal and total printed on the invoice, unrounded.
    pub fn invoice_amounts(&self) -> (f64, f64, f64) {
        let amount = self.amount.unwrap_or(0.0);
        let discount = self.discount.unwrap_or(0.0);
        let payable = self.payable.filter(|p| *p != 0.0).unwrap_or(amount);
        (amount, discount, payable)
    }

    /// Creation date as text; stored either as a string or a `{seconds}` timestamp.
    pub fn created_label(&self) -> String {
        match &self.created_at {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Object(ts)) => ts.get("seconds").or_else(|| ts.get("_seconds"))
                .and_then(Value::as_i64)
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".into()),
            _ => "-".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { Malformed(String), ReturnAlreadyBooked }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(m) => write!(f, "Malformed order document: {m}"),
            Self::ReturnAlreadyBooked => write!(f, "Return already booked for this order"),
        }
    }
}
