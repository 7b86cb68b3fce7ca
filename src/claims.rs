// src/claims.rs

use crate::error::IdentityGateError;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata field carrying the verified subject downstream.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
/// Metadata field carrying the verified display name downstream.
pub const USER_NAME_HEADER: HeaderName = HeaderName::from_static("x-user-name");

/// The claim set of an identity token.
///
/// Registered and identity claims are named fields; anything else the caller
/// supplied at login passes through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdentityClaims {
    pub fn new(sub: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sub: Some(sub.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// The identity the gateway hands to downstream handlers for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub user_id: String,
    pub username: String,
    user_id_value: HeaderValue,
    username_value: HeaderValue,
}

impl IdentityContext {
    /// Builds the context from verified claims. Both `sub` and `name` must be
    /// present and representable as header values.
    pub fn from_claims(claims: &IdentityClaims) -> Result<Self, IdentityGateError> {
        let user_id = claims
            .sub
            .clone()
            .ok_or_else(|| IdentityGateError::MissingIdentityClaim("sub".to_string()))?;
        let username = claims
            .name
            .clone()
            .ok_or_else(|| IdentityGateError::MissingIdentityClaim("name".to_string()))?;

        let user_id_value = HeaderValue::from_bytes(user_id.as_bytes())
            .map_err(|_| IdentityGateError::MissingIdentityClaim("sub".to_string()))?;
        let username_value = HeaderValue::from_bytes(username.as_bytes())
            .map_err(|_| IdentityGateError::MissingIdentityClaim("name".to_string()))?;

        Ok(Self {
            user_id,
            username,
            user_id_value,
            username_value,
        })
    }

    /// Writes the two identity fields, replacing any existing values.
    pub fn propagate(&self, headers: &mut HeaderMap) {
        headers.insert(USER_ID_HEADER, self.user_id_value.clone());
        headers.insert(USER_NAME_HEADER, self.username_value.clone());
    }

    /// Reads a previously propagated identity back out of request metadata.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id_value = headers.get(USER_ID_HEADER)?.clone();
        let username_value = headers.get(USER_NAME_HEADER)?.clone();
        Some(Self {
            user_id: String::from_utf8_lossy(user_id_value.as_bytes()).into_owned(),
            username: String::from_utf8_lossy(username_value.as_bytes()).into_owned(),
            user_id_value,
            username_value,
        })
    }
}

/// Removes identity fields a caller may have set on its own request.
pub fn strip_identity(headers: &mut HeaderMap) {
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_NAME_HEADER);
}
