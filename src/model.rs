// src/model.rs

use serde::{Deserialize, Serialize};

/// Represents a single JSON Web Key (JWK) as defined in RFC 7517.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// Represents a JSON Web Key Set (JWKS), the verification document published
/// at `/.well-known/jwks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    pub fn find(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwks_deserialization() {
        let json = r#"{
            "keys": [
                {"kty": "RSA", "kid": "key-1", "use": "sig", "alg": "RS256", "n": "AQAB", "e": "AQAB"},
                {"kty": "OKP", "kid": "key-2"}
            ]
        }"#;

        let jwks: JsonWebKeySet = serde_json::from_str(json).unwrap();
        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys[0].use_purpose.as_deref(), Some("sig"));
        assert_eq!(jwks.keys[0].alg.as_deref(), Some("RS256"));
        assert!(jwks.keys[1].n.is_none());
        assert_eq!(jwks.find("key-2").map(|k| k.kty.as_str()), Some("OKP"));
        assert!(jwks.find("key-3").is_none());
    }

    #[test]
    fn test_jwk_serialization_skips_absent_members() {
        let jwk = JsonWebKey {
            kty: "RSA".to_string(),
            kid: "abc".to_string(),
            use_purpose: Some("sig".to_string()),
            alg: None,
            n: Some("n".to_string()),
            e: Some("e".to_string()),
        };
        let json = serde_json::to_value(&jwk).unwrap();
        assert_eq!(json["use"], "sig");
        assert!(json.get("alg").is_none());
    }

    #[test]
    fn test_empty_jwks() {
        let json = serde_json::to_string(&JsonWebKeySet::default()).unwrap();
        assert_eq!(json, r#"{"keys":[]}"#);
    }
}
