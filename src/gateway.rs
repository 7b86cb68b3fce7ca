// src/gateway.rs

use crate::claims::IdentityContext;
use crate::error::IdentityGateError;
use crate::validator::Validator;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use tracing::{debug, instrument, warn};

/// Where a request ended up after one pass through the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Pre-flight or non-JSON read; let through with no identity attached.
    Bypass,
    /// No usable bearer credential was presented.
    Unauthenticated(IdentityGateError),
    /// A credential was presented and failed verification.
    Forbidden(IdentityGateError),
    /// The token verified; this identity is propagated downstream.
    Verified(IdentityContext),
}

impl GatewayOutcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Bypass | Self::Verified(_) => StatusCode::OK,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

/// The per-request verification state machine.
#[derive(Clone)]
pub struct Gateway {
    validator: Validator,
}

impl Gateway {
    pub fn new(validator: Validator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Runs one request through bypass, credential extraction and verification.
    ///
    /// The returned outcome is terminal; nothing here retries.
    #[instrument(skip_all, fields(%method))]
    pub async fn evaluate(&self, method: &Method, headers: &HeaderMap) -> GatewayOutcome {
        if is_bypass(method, headers) {
            debug!("Bypassing authentication.");
            return GatewayOutcome::Bypass;
        }

        let token = match extract_bearer_token(headers) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Rejecting unauthenticated request.");
                return GatewayOutcome::Unauthenticated(e);
            }
        };

        let verified = self
            .validator
            .validate(token)
            .await
            .and_then(|data| IdentityContext::from_claims(&data.claims));

        match verified {
            Ok(identity) => {
                debug!(user_id = %identity.user_id, "Token verified.");
                GatewayOutcome::Verified(identity)
            }
            Err(e) => {
                warn!(error = %e, "Token verification failed.");
                GatewayOutcome::Forbidden(e)
            }
        }
    }
}

/// `OPTIONS`, and `GET` whose content type is not JSON, need no identity.
///
/// The JSON check compares the media type only, case-insensitively, so
/// `application/json; charset=utf-8` is JSON and must authenticate. Matching
/// the raw header against `application/json` exactly would let such reads
/// through unauthenticated.
fn is_bypass(method: &Method, headers: &HeaderMap) -> bool {
    if method == Method::OPTIONS {
        return true;
    }
    method == Method::GET && !is_json(headers)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, IdentityGateError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| IdentityGateError::MalformedAuthHeader("missing".to_string()))?
        .to_str()
        .map_err(|_| IdentityGateError::MalformedAuthHeader("not visible ASCII".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| IdentityGateError::MalformedAuthHeader("not a Bearer credential".to_string()))?;

    if token.trim().is_empty() {
        return Err(IdentityGateError::MalformedAuthHeader("empty token".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_bypass_rules() {
        assert!(is_bypass(&Method::OPTIONS, &HeaderMap::new()));
        assert!(is_bypass(&Method::OPTIONS, &headers(&[("content-type", "application/json")])));
        assert!(is_bypass(&Method::GET, &HeaderMap::new()));
        assert!(is_bypass(&Method::GET, &headers(&[("content-type", "text/html")])));
        assert!(!is_bypass(&Method::GET, &headers(&[("content-type", "application/json")])));
        assert!(!is_bypass(
            &Method::GET,
            &headers(&[("content-type", "Application/JSON; charset=utf-8")])
        ));
        assert!(!is_bypass(&Method::POST, &HeaderMap::new()));
        assert!(!is_bypass(&Method::DELETE, &headers(&[("content-type", "text/plain")])));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_bearer_token(&headers(&[("authorization", "Bearer abc.def.ghi")])),
            Ok("abc.def.ghi")
        );
        assert!(matches!(
            extract_bearer_token(&HeaderMap::new()),
            Err(IdentityGateError::MalformedAuthHeader(_))
        ));
        assert!(matches!(
            extract_bearer_token(&headers(&[("authorization", "Basic dXNlcjpwYXNz")])),
            Err(IdentityGateError::MalformedAuthHeader(_))
        ));
        assert!(matches!(
            extract_bearer_token(&headers(&[("authorization", "bearer abc")])),
            Err(IdentityGateError::MalformedAuthHeader(_))
        ));
        assert!(matches!(
            extract_bearer_token(&headers(&[("authorization", "Bearer ")])),
            Err(IdentityGateError::MalformedAuthHeader(_))
        ));
    }

    #[test]
    fn test_outcome_status_codes() {
        assert_eq!(GatewayOutcome::Bypass.status_code(), StatusCode::OK);
        assert_eq!(
            GatewayOutcome::Unauthenticated(IdentityGateError::MalformedAuthHeader("missing".into()))
                .status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayOutcome::Forbidden(IdentityGateError::SignatureInvalid).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
