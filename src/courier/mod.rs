//! Courier integration for reverse (return) shipments.

pub mod payload;
pub mod xpressbees;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use payload::{remarks, PayloadContext, ReversePayload};
pub use xpressbees::XpressbeesClient;

#[derive(Debug, Error)]
pub enum CourierError {
    #[error("courier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Upstream message, or `HTTP <status>` when the body carries none.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Login ok but no token")]
    MissingToken,
}

/// Raw reply of the shipment endpoint. Bodies that are not JSON arrive as a
/// JSON string.
#[derive(Clone, Debug)]
pub struct CourierReply { pub status: u16, pub body: Value }

impl CourierReply {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
    pub fn is_auth_failure(&self) -> bool { self.status == 401 || self.status == 403 }
}

#[async_trait]
pub trait CourierApi: Send + Sync {
    /// Exchange stored credentials for a bearer token.
    async fn login(&self) -> Result<String, CourierError>;
    async fn submit_reverse_shipment(&self, token: &str, payload: &ReversePayload) -> Result<CourierReply, CourierError>;
}

/// Identifiers the courier assigned to a booked shipment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookedShipment { pub awb: Option<String>, pub shipment_id: Option<String>, pub raw: Value }

fn id_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_of(obj: &Value, keys: &[&str]) -> Option<String> { keys.iter().find_map(|k| obj.get(k).and_then(id_text)) }

/// Pull the message an error body carries, else `HTTP <status>`.
pub fn upstream_message(status: u16, body: &Value) -> String {
    ["message", "error"].iter()
        .find_map(|k| body.get(k).and_then(|v| match v { Value::String(s) if !s.is_empty() => Some(s.clone()), Value::Null => None, other => Some(other.to_string()) }))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

impl BookedShipment {
    /// Tracking ids live under `data` or at the body root, under varying keys.
    pub fn from_reply(body: Value) -> Self {
        let scope = match body.get("data") { Some(d) if d.is_object() => d, _ => &body };
        let awb = first_of(scope, &["awb_number", "awb", "awbno"]);
        let shipment_id = first_of(scope, &["shipment_id", "order_id", "id"]);
        Self { awb, shipment_id, raw: body }
    }
}

/// Authenticate and submit; on 401/403 log in again and retry exactly once.
pub async fn book_reverse_shipment(api: &dyn CourierApi, payload: &ReversePayload) -> Result<BookedShipment, CourierError> {
    let token = api.login().await?;
    let mut reply = api.submit_reverse_shipment(&token, payload).await?;
    if reply.is_auth_failure() {
        tracing::info!(status = reply.status, "courier rejected token, retrying with a fresh one");
        let fresh = api.login().await?;
        reply = api.submit_reverse_shipment(&fresh, payload).await?;
    }
    if !reply.is_success() {
        let message = upstream_message(reply.status, &reply.body);
        tracing::warn!(status = reply.status, %message, "reverse shipment rejected");
        return Err(CourierError::Rejected { status: reply.status, message });
    }
    Ok(BookedShipment::from_reply(reply.body))
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted courier: replays queued shipment replies and counts calls.
    #[derive(Default)]
    pub struct FakeCourier {
        pub replies: Mutex<VecDeque<CourierReply>>,
        pub logins: Mutex<u32>,
        pub submissions: Mutex<Vec<(String, ReversePayload)>>,
    }

    impl FakeCourier {
        pub fn replying(replies: Vec<(u16, Value)>) -> Self {
            let q = replies.into_iter().map(|(status, body)| CourierReply { status, body }).collect();
            Self { replies: Mutex::new(q), ..Self::default() }
        }
        pub fn login_count(&self) -> u32 { *self.logins.lock().unwrap() }
        pub fn submission_count(&self) -> usize { self.submissions.lock().unwrap().len() }
    }

    #[async_trait]
    impl CourierApi for FakeCourier {
        async fn login(&self) -> Result<String, CourierError> {
            let mut n = self.logins.lock().unwrap();
            *n += 1;
            Ok(format!("token-{n}"))
        }
        async fn submit_reverse_shipment(&self, token: &str, payload: &ReversePayload) -> Result<CourierReply, CourierError> {
            self.submissions.lock().unwrap().push((token.to_string(), payload.clone()));
            let next = self.replies.lock().unwrap().pop_front();
            Ok(next.unwrap_or(CourierReply { status: 500, body: Value::Null }))
        }
    }
}
