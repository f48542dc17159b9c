//! Outbound WhatsApp notifications through a template-based messaging API.

pub mod twilio;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::value_objects::WhatsAppAddress;

pub use twilio::TwilioWhatsApp;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing_config")]
    MissingConfig,
    #[error("messaging request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
}

/// A pre-approved template with positional variables `1..n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateMessage {
    pub to: WhatsAppAddress,
    pub template_sid: String,
    pub variables: Vec<String>,
}

impl TemplateMessage {
    /// Variables as the provider expects them: `{"1": "...", "2": "..."}`.
    pub fn variables_json(&self) -> String {
        let m: Map<String, Value> = self.variables.iter().enumerate()
            .map(|(i, v)| ((i + 1).to_string(), Value::String(v.clone())))
            .collect();
        Value::Object(m).to_string()
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the provider's message id when it reports one.
    async fn send_template(&self, msg: &TemplateMessage) -> Result<Option<String>, NotifyError>;
}
