//! Back-office operations. Each one authorizes the caller, reads documents
//! through the store and applies the aggregate's rules.

pub mod invoice;
pub mod refunds;
pub mod returns;

use serde::{Deserialize, Deserializer};

use crate::domain::value_objects::deserialize_text;

pub use invoice::render_invoice;
pub use refunds::{resolve_refund_request, ResolveRefundOutcome, ResolveRefundRequest};
pub use returns::{create_return, return_status, CreateReturnOutcome, CreateReturnRequest, ReturnStatus};

/// Text field with surrounding whitespace removed.
pub(crate) fn deserialize_trimmed<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(deserialize_text(d)?.trim().to_string())
}

/// Same as [`deserialize_trimmed`] but keeps absence distinct from blank.
pub(crate) fn deserialize_opt_trimmed<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<serde_json::Value>::deserialize(d)?.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::auth::Caller;
    use crate::config::AppConfig;
    use crate::courier::fake::FakeCourier;
    use crate::messaging::fake::FakeNotifier;
    use crate::store::InMemoryStore;
    use crate::AppState;

    pub const SECRET: &str = "test-secret";

    /// Courier credentials and messaging are both configured.
    pub fn config() -> AppConfig {
        let mut cfg = AppConfig::for_secret(SECRET, &["owner@megance.com"]);
        cfg.courier.username = "ops@megance.com".into();
        cfg.courier.password = "hunter2".into();
        cfg.messaging.account_sid = "AC123".into();
        cfg.messaging.auth_token = "tok".into();
        cfg.messaging.whatsapp_from = "+14155238886".into();
        cfg.messaging.rejected_template_sid = "HXREJ".into();
        cfg
    }

    pub fn state_with(store: Arc<InMemoryStore>, courier: Arc<FakeCourier>, notifier: Arc<FakeNotifier>) -> AppState {
        AppState { config: Arc::new(config()), store, courier, notifier }
    }

    pub fn admin() -> Caller { Caller { uid: "admin-1".into(), email: "owner@megance.com".into(), is_admin: true } }
    pub fn customer(uid: &str) -> Caller { Caller { uid: uid.into(), email: format!("{uid}@mail.com"), is_admin: false } }
}
