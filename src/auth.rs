//! Caller identity from HS256 bearer tokens issued by the identity service.

use axum::http::HeaderMap;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::BackofficeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    #[serde(default)]
    pub email: String,
    /// Custom claim set on staff accounts.
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

/// Authenticated caller of a back-office endpoint.
#[derive(Debug, Clone)]
pub struct Caller {
    pub uid: String,
    pub email: String,
    pub is_admin: bool,
}

impl Caller {
    pub fn from_claims(claims: Claims, cfg: &AuthConfig) -> Self {
        let is_admin = claims.admin || cfg.is_admin_email(&claims.email);
        Self { uid: claims.sub, email: claims.email, is_admin }
    }

    pub fn require_admin(&self) -> Result<(), BackofficeError> {
        if self.is_admin { Ok(()) } else { Err(BackofficeError::PermissionDenied("Admin only".into())) }
    }

    /// Name recorded as `processedBy`.
    pub fn actor(&self) -> String { if self.email.is_empty() { "(admin)".into() } else { self.email.clone() } }
}

/// Bearer token from `Authorization`, else from the `token` query parameter.
pub fn bearer_token<'a>(headers: &'a HeaderMap, query_token: Option<&'a str>) -> Option<&'a str> {
    headers.get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, t)| t.trim())
        .filter(|t| !t.is_empty())
        .or_else(|| query_token.map(str::trim).filter(|t| !t.is_empty()))
}

pub fn authenticate(token: Option<&str>, cfg: &AuthConfig) -> Result<Caller, BackofficeError> {
    let token = token.ok_or(BackofficeError::Unauthenticated)?;
    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(cfg.jwt_secret.as_bytes()), &Validation::default())
        .map_err(|e| {
            tracing::debug!("token validation failed: {e}");
            BackofficeError::Unauthenticated
        })?;
    Ok(Caller::from_claims(data.claims, cfg))
}

#[cfg(test)]
pub(crate) fn issue_token(uid: &str, email: &str, admin: bool, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    let claims = Claims { sub: uid.into(), email: email.into(), admin, exp };
    jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_admin_by_claim_or_allow_list() {
        let cfg = AppConfig::for_secret("secret", &["owner@shop.com"]).auth;
        let t = issue_token("u1", "Owner@Shop.com", false, "secret").unwrap();
        assert!(authenticate(Some(&t), &cfg).unwrap().is_admin);
        let t = issue_token("u2", "staff@shop.com", true, "secret").unwrap();
        assert!(authenticate(Some(&t), &cfg).unwrap().is_admin);
        let t = issue_token("u3", "buyer@mail.com", false, "secret").unwrap();
        let caller = authenticate(Some(&t), &cfg).unwrap();
        assert!(!caller.is_admin);
        assert!(matches!(caller.require_admin(), Err(BackofficeError::PermissionDenied(_))));
    }

    #[test]
    fn test_rejects_bad_tokens() {
        let cfg = AppConfig::for_secret("secret", &[]).auth;
        assert!(matches!(authenticate(None, &cfg), Err(BackofficeError::Unauthenticated)));
        let t = issue_token("u1", "a@b.c", true, "other").unwrap();
        assert!(matches!(authenticate(Some(&t), &cfg), Err(BackofficeError::Unauthenticated)));
    }

    #[test]
    fn test_bearer_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers, Some(" q ")), Some("q"));
        headers.insert("authorization", "Bearer h".parse().unwrap());
        assert_eq!(bearer_token(&headers, Some("q")), Some("h"));
        assert_eq!(bearer_token(&headers, None), Some("h"));
        headers.insert("authorization", "bearer lower".parse().unwrap());
        assert_eq!(bearer_token(&headers, None), Some("lower"));
        headers.insert("authorization", "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers, Some("q")), Some("q"));
    }
}
