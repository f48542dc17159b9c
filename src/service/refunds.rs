//! Admin decision on a customer's refund request.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::domain::aggregates::{Decision, RefundRequest, RefundStatus};
use crate::domain::events::{DomainEvent, RefundEvent};
use crate::domain::value_objects::WhatsAppAddress;
use crate::messaging::TemplateMessage;
use crate::store::{refund_path, user_refund_path};
use crate::{AppState, BackofficeError, Result, SideEffect};

use super::deserialize_opt_trimmed;

/// The decision may arrive as `status` or `decision`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolveRefundRequest {
    #[serde(deserialize_with = "deserialize_opt_trimmed")]
    pub status: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_trimmed")]
    pub decision: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_trimmed")]
    pub notes: Option<String>,
}

impl ResolveRefundRequest {
    fn decision(&self) -> Result<Decision> {
        let raw = [&self.status, &self.decision].into_iter().flatten().find(|s| !s.is_empty()).map_or("", String::as_str);
        Ok(Decision::parse(raw)?)
    }

    fn note(&self) -> Option<&str> { self.notes.as_deref().filter(|n| !n.is_empty()) }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRefundOutcome {
    pub ok: bool,
    pub status: RefundStatus,
    pub side_effects: Vec<SideEffect>,
}

pub async fn resolve_refund_request(state: &AppState, caller: &Caller, id: &str, req: ResolveRefundRequest) -> Result<ResolveRefundOutcome> {
    caller.require_admin()?;
    let id = id.trim();
    if id.is_empty() { return Err(BackofficeError::InvalidArgument("id is required".into())); }
    let decision = req.decision()?;
    if decision == Decision::Reject && req.note().is_none() {
        return Err(BackofficeError::InvalidArgument("Rejection note is required".into()));
    }

    let doc = state.store.get(&refund_path(id)).await?
        .ok_or_else(|| BackofficeError::NotFound("Request not found".into()))?;
    let mut request = RefundRequest::from_document(id, doc)?;
    request.resolve(decision, req.note(), &caller.actor(), Utc::now())?;

    let patch = request.decision_patch();
    state.store.merge(&refund_path(id), patch.clone()).await?;
    tracing::info!(request_id = id, status = request.status().as_str(), actor = %caller.actor(), "refund request resolved");

    let mut side_effects = vec![match request.owner() {
        Some(uid) => SideEffect::from_result("user_refund_mirror", state.store.merge(&user_refund_path(uid, id), patch).await),
        None => SideEffect::skipped("user_refund_mirror", "request has no owner"),
    }];
    for event in request.take_events() {
        if let DomainEvent::Refund(RefundEvent::Rejected { note, .. }) = event {
            side_effects.push(notify_rejection(state, &request, note).await);
        }
    }

    Ok(ResolveRefundOutcome { ok: true, status: request.status().clone(), side_effects })
}

async fn notify_rejection(state: &AppState, request: &RefundRequest, note: String) -> SideEffect {
    const NAME: &str = "whatsapp_rejection";
    let messaging = &state.config.messaging;
    let template = match messaging.rejection_template() {
        Some(t) if messaging.is_configured() => t,
        _ => return SideEffect::skipped(NAME, "missing_config"),
    };
    let contact = request.contact();
    let Some(to) = WhatsAppAddress::parse(&contact.phone) else {
        return SideEffect::skipped(NAME, "contact has no phone");
    };
    let msg = TemplateMessage {
        to,
        template_sid: template.to_string(),
        variables: vec![contact.name.clone(), request.order_label(), "REJECTED".into(), note],
    };
    SideEffect::from_result(NAME, state.notifier.send_template(&msg).await)
}
