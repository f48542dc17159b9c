//! Twilio Messages API, WhatsApp channel

use async_trait::async_trait;
use serde_json::Value;

use super::{Notifier, NotifyError, TemplateMessage};
use crate::config::MessagingConfig;
use crate::domain::value_objects::WhatsAppAddress;

pub struct TwilioWhatsApp {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from: Option<WhatsAppAddress>,
}

impl TwilioWhatsApp {
    pub fn new(http: reqwest::Client, cfg: &MessagingConfig) -> Self {
        Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            account_sid: cfg.account_sid.clone(),
            auth_token: cfg.auth_token.clone(),
            from: WhatsAppAddress::sender(&cfg.whatsapp_from),
        }
    }

    fn endpoint(&self) -> String { format!("{}/2010-04-01/Accounts/{}/Messages.json", self.api_base, self.account_sid) }
}

#[async_trait]
impl Notifier for TwilioWhatsApp {
    async fn send_template(&self, msg: &TemplateMessage) -> Result<Option<String>, NotifyError> {
        let from = match &self.from {
            Some(f) if !self.account_sid.is_empty() && !self.auth_token.is_empty() && !msg.template_sid.is_empty() => f,
            _ => return Err(NotifyError::MissingConfig),
        };
        let variables = msg.variables_json();
        let form = [
            ("From", from.as_str()),
            ("To", msg.to.as_str()),
            ("ContentSid", msg.template_sid.as_str()),
            ("ContentVariables", variables.as_str()),
        ];
        let resp = self.http
            .post(self.endpoint())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(if text.is_empty() { format!("HTTP {}", status.as_u16()) } else { text }));
        }
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        Ok(body.get("sid").and_then(Value::as_str).map(String::from))
    }
}
