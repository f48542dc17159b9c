//! Refund request Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::domain::events::{DomainEvent, RefundEvent};
use crate::domain::value_objects::{deserialize_or_default, deserialize_text};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus { #[default] Requested, Approved, Rejected }

impl RefundStatus {
    /// Unknown or missing values read as `requested`.
    pub fn from_text(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() { "approved" => Self::Approved, "rejected" => Self::Rejected, _ => Self::Requested }
    }
    pub fn as_str(&self) -> &'static str {
        match self { Self::Requested => "requested", Self::Approved => "approved", Self::Rejected => "rejected" }
    }
    pub fn is_terminal(&self) -> bool { *self != Self::Requested }
}

/// Admin verdict on a pending request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision { Approve, Reject }

impl Decision {
    pub fn parse(raw: &str) -> Result<Self, RefundError> {
        match raw.trim().to_lowercase().as_str() {
            "approved" => Ok(Self::Approve),
            "rejected" => Ok(Self::Reject),
            _ => Err(RefundError::UnknownDecision(raw.to_string())),
        }
    }
    pub fn status(self) -> RefundStatus { match self { Self::Approve => RefundStatus::Approved, Self::Reject => RefundStatus::Rejected } }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Contact {
    #[serde(deserialize_with = "deserialize_text")] pub name: String,
    #[serde(deserialize_with = "deserialize_text")] pub email: String,
    #[serde(deserialize_with = "deserialize_text")] pub phone: String,
    #[serde(deserialize_with = "deserialize_text")] pub city: String,
    #[serde(deserialize_with = "deserialize_text")] pub state: String,
    #[serde(deserialize_with = "deserialize_text")] pub zip: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderRef {
    #[serde(deserialize_with = "deserialize_text")] pub order_id: String,
    #[serde(deserialize_with = "deserialize_text")] pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RefundDocument {
    #[serde(deserialize_with = "deserialize_text")] status: String,
    #[serde(deserialize_with = "deserialize_or_default")] contact: Contact,
    #[serde(deserialize_with = "deserialize_or_default")] order_ref: OrderRef,
    #[serde(deserialize_with = "deserialize_text")] user_id: String,
}

#[derive(Clone, Debug)]
pub struct RefundRequest {
    id: String,
    status: RefundStatus,
    contact: Contact,
    order_ref: OrderRef,
    user_id: String,
    processed_by: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    decision_notes: Option<String>,
    events: Vec<DomainEvent>,
}

impl RefundRequest {
    pub fn from_document(id: impl Into<String>, doc: Value) -> Result<Self, RefundError> {
        let d: RefundDocument = serde_json::from_value(doc).map_err(|e| RefundError::Malformed(e.to_string()))?;
        Ok(Self {
            id: id.into(), status: RefundStatus::from_text(&d.status), contact: d.contact, order_ref: d.order_ref,
            user_id: d.user_id, processed_by: None, processed_at: None, decision_notes: None, events: vec![],
        })
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn status(&self) -> &RefundStatus { &self.status }
    pub fn contact(&self) -> &Contact { &self.contact }
    pub fn owner(&self) -> Option<&str> { Some(self.user_id.trim()).filter(|u| !u.is_empty()) }

    /// Order id the customer referenced, as shown in notifications.
    pub fn order_label(&self) -> String {
        let r = if self.order_ref.order_id.trim().is_empty() { &self.order_ref.id } else { &self.order_ref.order_id };
        r.trim().to_string()
    }

    /// Apply the admin decision. Rejections must carry a note.
    pub fn resolve(&mut self, decision: Decision, note: Option<&str>, actor: &str, now: DateTime<Utc>) -> Result<(), RefundError> {
        if self.status.is_terminal() { return Err(RefundError::AlreadyResolved(self.status.as_str())); }
        let note = note.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
        if decision == Decision::Reject && note.is_none() { return Err(RefundError::MissingRejectionNote); }
        self.status = decision.status();
        self.processed_by = Some(actor.to_string());
        self.processed_at = Some(now);
        self.decision_notes = note.clone();
        let event = match decision {
            Decision::Approve => RefundEvent::Approved { request_id: self.id.clone() },
            Decision::Reject => RefundEvent::Rejected { request_id: self.id.clone(), note: note.unwrap_or_default() },
        };
        self.raise_event(DomainEvent::Refund(event));
        Ok(())
    }

    /// Fields written to the request and its user mirror.
    pub fn decision_patch(&self) -> Value {
        json!({
            "status": self.status.as_str(),
            "processedAt": self.processed_at.map(|t| t.to_rfc3339()),
            "processedBy": self.processed_by,
            "decisionNotes": self.decision_notes,
        })
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundError { UnknownDecision(String), MissingRejectionNote, AlreadyResolved(&'static str), Malformed(String) }
impl std::error::Error for RefundError {}
impl std::fmt::Display for RefundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDecision(_) => write!(f, "status must be approved|rejected"),
            Self::MissingRejectionNote => write!(f, "Rejection note is required"),
            Self::AlreadyResolved(s) => write!(f, "Request already {s}"),
            Self::Malformed(m) => write!(f, "Malformed refund request: {m}"),
        }
    }
}
