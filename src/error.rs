// src/error.rs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

/// The primary error type for the `identity-gate` library.
///
/// Every variant carries plain string context so the error can be cloned out of
/// the shared key cache, where concurrent callers receive the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityGateError {
    /// The signing keypair could not be read or parsed. Fatal at startup.
    #[error("Failed to load signing key: {0}")]
    KeyLoadFailure(String),

    /// No `Authorization: Bearer <token>` credential was presented.
    #[error("Missing or malformed Authorization header: {0}")]
    MalformedAuthHeader(String),

    /// The token could not be parsed as a compact JWS.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The JWT header is missing the required 'kid' (Key ID) field.
    #[error("The JWT header is missing the 'kid' (Key ID) field")]
    MissingKeyId,

    /// The algorithm in the token header is not accepted by this verifier.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No published key matches the token's 'kid', even after a refresh.
    #[error("Unknown signing key for kid: {0}")]
    UnknownSigningKey(String),

    /// The signature does not verify against the resolved key.
    #[error("Token signature is invalid")]
    SignatureInvalid,

    /// The issuer or audience claim does not match the expected value.
    #[error("Claim mismatch: {0}")]
    ClaimMismatch(String),

    /// The token carries an expiry (or not-before) that rejects it now.
    #[error("Token is expired or not yet valid")]
    TokenExpired,

    /// A claim required to build the propagated identity is absent or unusable.
    #[error("Identity claim '{0}' is missing or cannot be propagated")]
    MissingIdentityClaim(String),

    /// The remote verification document could not be fetched or parsed.
    #[error("Failed to fetch verification keys: {0}")]
    NetworkFetchFailure(String),

    /// Signing a new token failed.
    #[error("Token generation failed: {0}")]
    TokenGenerationError(String),

    /// A required configuration field is missing.
    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl IdentityGateError {
    /// Maps a `jsonwebtoken` decode failure onto the verification taxonomy.
    pub(crate) fn from_jwt(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => Self::SignatureInvalid,
            ErrorKind::InvalidIssuer => Self::ClaimMismatch("iss".to_string()),
            ErrorKind::InvalidAudience => Self::ClaimMismatch("aud".to_string()),
            ErrorKind::MissingRequiredClaim(claim) => Self::ClaimMismatch(claim.clone()),
            ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => Self::TokenExpired,
            ErrorKind::InvalidAlgorithm => Self::UnsupportedAlgorithm("key/header mismatch".to_string()),
            _ => Self::MalformedToken(err.to_string()),
        }
    }

    /// The status a caller sees for this failure. The body never carries the reason.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedAuthHeader(_) => StatusCode::UNAUTHORIZED,
            Self::MalformedToken(_)
            | Self::MissingKeyId
            | Self::UnsupportedAlgorithm(_)
            | Self::UnknownSigningKey(_)
            | Self::SignatureInvalid
            | Self::ClaimMismatch(_)
            | Self::TokenExpired
            | Self::MissingIdentityClaim(_)
            | Self::NetworkFetchFailure(_) => StatusCode::FORBIDDEN,
            Self::KeyLoadFailure(_)
            | Self::TokenGenerationError(_)
            | Self::MissingConfiguration(_)
            | Self::InvalidConfiguration(_)
            | Self::InvalidUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IdentityGateError {
    fn into_response(self) -> Response {
        self.status_code().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_error_mapping() {
        let sig: jsonwebtoken::errors::Error = ErrorKind::InvalidSignature.into();
        assert_eq!(IdentityGateError::from_jwt(sig), IdentityGateError::SignatureInvalid);

        let aud: jsonwebtoken::errors::Error = ErrorKind::InvalidAudience.into();
        assert!(matches!(IdentityGateError::from_jwt(aud), IdentityGateError::ClaimMismatch(c) if c == "aud"));

        let iss: jsonwebtoken::errors::Error = ErrorKind::InvalidIssuer.into();
        assert!(matches!(IdentityGateError::from_jwt(iss), IdentityGateError::ClaimMismatch(c) if c == "iss"));

        let exp: jsonwebtoken::errors::Error = ErrorKind::ExpiredSignature.into();
        assert_eq!(IdentityGateError::from_jwt(exp), IdentityGateError::TokenExpired);

        let bad: jsonwebtoken::errors::Error = ErrorKind::InvalidToken.into();
        assert!(matches!(IdentityGateError::from_jwt(bad), IdentityGateError::MalformedToken(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            IdentityGateError::MalformedAuthHeader("missing".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(IdentityGateError::SignatureInvalid.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            IdentityGateError::NetworkFetchFailure("timeout".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            IdentityGateError::TokenGenerationError("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_response_body_is_empty() {
        let response = IdentityGateError::ClaimMismatch("aud".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}
