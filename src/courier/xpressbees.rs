//! XpressBees REST client (no SDK dependency)

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{upstream_message, CourierApi, CourierError, CourierReply, ReversePayload};
use crate::config::CourierConfig;

pub struct XpressbeesClient {
    http: reqwest::Client,
    origin: String,
    email: String,
    password: String,
}

impl XpressbeesClient {
    pub fn new(http: reqwest::Client, cfg: &CourierConfig) -> Self {
        Self { http, origin: cfg.origin(), email: cfg.username.trim().to_string(), password: cfg.password.trim().to_string() }
    }

    fn url(&self, path: &str) -> String { format!("{}{path}", self.origin) }
}

/// The token sits under `data` (as a string), or one of the usual keys.
pub fn extract_token(body: &Value) -> Option<String> {
    if let Some(Value::String(s)) = body.get("data") {
        if !s.is_empty() { return Some(s.clone()); }
    }
    let candidates = [
        body.get("token"),
        body.get("access_token"),
        body.get("data").and_then(|d| d.get("token")),
        body.get("data").and_then(|d| d.get("access_token")),
    ];
    candidates.into_iter().flatten().find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(String::from))
}

async fn read_body(resp: reqwest::Response) -> Value {
    let text = resp.text().await.unwrap_or_default();
    if text.is_empty() { return Value::Null; }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait]
impl CourierApi for XpressbeesClient {
    async fn login(&self) -> Result<String, CourierError> {
        let resp = self.http
            .post(self.url("/api/users/login"))
            .json(&json!({ "email": self.email, "password": self.password }))
            .send()
            .await?;
        let status = resp.status();
        let body = read_body(resp).await;
        if !status.is_success() {
            return Err(CourierError::Rejected { status: status.as_u16(), message: upstream_message(status.as_u16(), &body) });
        }
        extract_token(&body).ok_or(CourierError::MissingToken)
    }

    async fn submit_reverse_shipment(&self, token: &str, payload: &ReversePayload) -> Result<CourierReply, CourierError> {
        let resp = self.http
            .post(self.url("/api/shipments2"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        let status = resp.status().as_u16();
        tracing::debug!(status, order_number = %payload.order_number, "shipment endpoint replied");
        Ok(CourierReply { status, body: read_body(resp).await })
    }
}
