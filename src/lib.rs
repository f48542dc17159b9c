//! OpenSASE Back-office
//!
//! Server-side functions behind the store admin panel.
//!
//! ## Features
//! - Reverse (return) shipments booked with the courier, at most once per order
//! - Refund request decisions with WhatsApp notice on rejection
//! - Printable HTML invoices for owners and admins

pub mod api;
pub mod auth;
pub mod config;
pub mod courier;
pub mod domain;
pub mod messaging;
pub mod service;
pub mod store;

use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::AppConfig;
use crate::courier::{CourierApi, CourierError};
use crate::domain::aggregates::{OrderError, RefundError};
use crate::messaging::Notifier;
use crate::store::{DocumentStore, StoreError};

// =============================================================================
// Shared State
// =============================================================================

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub courier: Arc<dyn CourierApi>,
    pub notifier: Arc<dyn Notifier>,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum BackofficeError {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl BackofficeError {
    /// Stable identifier sent to the admin panel.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission-denied",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument(_) => "invalid-argument",
            Self::NotFound(_) => "not-found",
            Self::FailedPrecondition(_) => "failed-precondition",
            Self::Upstream(_) => "upstream",
            Self::Storage(_) | Self::Internal(_) => "internal",
        }
    }
}

impl From<CourierError> for BackofficeError {
    fn from(e: CourierError) -> Self { Self::Upstream(e.to_string()) }
}

impl From<OrderError> for BackofficeError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::ReturnAlreadyBooked => Self::FailedPrecondition(e.to_string()),
            OrderError::Malformed(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<RefundError> for BackofficeError {
    fn from(e: RefundError) -> Self {
        match e {
            RefundError::UnknownDecision(_) | RefundError::MissingRejectionNote => Self::InvalidArgument(e.to_string()),
            RefundError::AlreadyResolved(_) => Self::FailedPrecondition(e.to_string()),
            RefundError::Malformed(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for BackofficeError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let first = errors.field_errors().into_values()
            .flat_map(|v| v.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()));
        Self::InvalidArgument(first.unwrap_or_else(|| errors.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, BackofficeError>;

// =============================================================================
// Best-effort Side Effects
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SideEffectOutcome {
    Applied,
    Skipped { reason: String },
    Failed { error: String },
}

/// Result of an auxiliary step. Reported next to the primary outcome and
/// never turned into an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SideEffect {
    pub name: &'static str,
    #[serde(flatten)]
    pub outcome: SideEffectOutcome,
}

impl SideEffect {
    pub fn applied(name: &'static str) -> Self { Self { name, outcome: SideEffectOutcome::Applied } }

    pub fn skipped(name: &'static str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::debug!(side_effect = name, %reason, "side effect skipped");
        Self { name, outcome: SideEffectOutcome::Skipped { reason } }
    }

    pub fn from_result<T, E: Display>(name: &'static str, result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::applied(name),
            Err(e) => {
                tracing::warn!(side_effect = name, error = %e, "side effect failed");
                Self { name, outcome: SideEffectOutcome::Failed { error: e.to_string() } }
            }
        }
    }

    pub fn is_applied(&self) -> bool { self.outcome == SideEffectOutcome::Applied }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe { #[validate(length(min = 1, message = "id is required"))] id: String }

    #[test]
    fn test_validation_message_surfaces() {
        let err: BackofficeError = Probe { id: String::new() }.validate().unwrap_err().into();
        assert_eq!(err.kind(), "invalid-argument");
        assert_eq!(err.to_string(), "id is required");
    }

    #[test]
    fn test_side_effect_serializes_flat() {
        let s = SideEffect::from_result::<(), _>("notify", Err("HTTP 500"));
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v, serde_json::json!({"name": "notify", "outcome": "failed", "error": "HTTP 500"}));
        assert!(SideEffect::from_result::<_, String>("mirror", Ok(())).is_applied());
    }

    #[test]
    fn test_refund_errors_map_to_kinds() {
        assert_eq!(BackofficeError::from(RefundError::MissingRejectionNote).kind(), "invalid-argument");
        assert_eq!(BackofficeError::from(RefundError::AlreadyResolved("approved")).kind(), "failed-precondition");
    }
}
