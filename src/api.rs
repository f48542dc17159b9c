//! HTTP surface of the back-office.

use axum::{body::Bytes, extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, response::{Html, IntoResponse, Response}, routing::{get, post}, Json, Router};
use serde::{de::DeserializeOwned, Deserialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{authenticate, bearer_token, Caller};
use crate::service::{self, CreateReturnOutcome, CreateReturnRequest, ResolveRefundOutcome, ResolveRefundRequest, ReturnStatus};
use crate::{AppState, BackofficeError, Result};

impl BackofficeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BackofficeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        }
        let body = serde_json::json!({"error": {"kind": self.kind(), "message": self.to_string()}});
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-backoffice"})) }))
        .route("/api/v1/admin/returns", post(create_return))
        .route("/api/v1/admin/orders/:id/return", get(return_status))
        .route("/api/v1/admin/refund-requests/:id/resolve", post(resolve_refund))
        .route("/api/v1/orders/:id/invoice", get(invoice))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[derive(Debug, Default, Deserialize)] pub struct TokenQuery { pub token: Option<String> }

fn caller(s: &AppState, headers: &HeaderMap, query_token: Option<&str>) -> Result<Caller> {
    authenticate(bearer_token(headers, query_token), &s.config.auth)
}

/// Bodies are parsed after authentication so a bad body never masks a 401.
/// An empty body reads as `{}`.
fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) { b"{}" } else { &body[..] };
    serde_json::from_slice(raw).map_err(|e| BackofficeError::InvalidArgument(format!("Invalid JSON body: {e}")))
}

async fn create_return(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<CreateReturnOutcome>> {
    let c = caller(&s, &headers, None)?;
    let r: CreateReturnRequest = json_body(&body)?;
    Ok(Json(service::create_return(&s, &c, r).await?))
}

async fn return_status(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<Json<ReturnStatus>> {
    let c = caller(&s, &headers, None)?;
    Ok(Json(service::return_status(&s, &c, &id).await?))
}

async fn resolve_refund(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>, body: Bytes) -> Result<Json<ResolveRefundOutcome>> {
    let c = caller(&s, &headers, None)?;
    let r: ResolveRefundRequest = json_body(&body)?;
    Ok(Json(service::resolve_refund_request(&s, &c, &id, r).await?))
}

async fn invoice(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>, Query(q): Query<TokenQuery>) -> Result<Html<String>> {
    let c = caller(&s, &headers, q.token.as_deref())?;
    Ok(Html(service::render_invoice(&s, &c, &id).await?))
}
