// src/generator/mod.rs

pub mod key_store;

use crate::claims::IdentityClaims;
use crate::clock::{Clock, SystemClock};
use crate::error::IdentityGateError;
use crate::model::JsonWebKeySet;
use jsonwebtoken::{decode, encode, Algorithm, Header, TokenData, Validation};
use key_store::{KeyStore, SigningKeyConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn default_algorithm() -> Algorithm {
    Algorithm::RS256
}

/// Configuration for the identity token issuer.
#[derive(Deserialize, Clone, Debug)]
pub struct GeneratorConfig {
    /// Value placed in the `iss` claim of every token.
    pub issuer: String,
    /// Value placed in the `aud` claim of every token.
    pub audience: String,
    /// The RSA-family algorithm used for signing.
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,
    /// Lifetime of issued tokens. `None` issues tokens without an `exp` claim.
    #[serde(default)]
    pub token_ttl_seconds: Option<u64>,
    /// The key material used for signing tokens.
    pub signing_key: SigningKeyConfig,
}

/// Mints and locally verifies signed identity tokens.
#[derive(Clone)]
pub struct Generator {
    pub config: GeneratorConfig,
    keys: Arc<KeyStore>,
    clock: Arc<dyn Clock>,
}

impl Generator {
    /// Creates a new `Generator`, loading the keypair from disk.
    ///
    /// Fails with `KeyLoadFailure` if the key material cannot be read or parsed.
    pub fn new(config: GeneratorConfig) -> Result<Self, IdentityGateError> {
        let keys = KeyStore::load(&config.signing_key, config.algorithm)?;
        Ok(Self::with_key_store(config, keys, Arc::new(SystemClock)))
    }

    /// Creates a `Generator` around an already loaded keypair and an explicit clock.
    pub fn with_key_store(config: GeneratorConfig, keys: KeyStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            keys: Arc::new(keys),
            clock,
        }
    }

    /// The key identifier of the active signing key.
    pub fn kid(&self) -> &str {
        self.keys.kid()
    }

    /// Issues a compact signed token for the given claims.
    ///
    /// `iss`, `aud` and `iat` are always set here, overriding caller values;
    /// `exp` is set only when a token lifetime is configured.
    pub fn issue(&self, claims: IdentityClaims) -> Result<String, IdentityGateError> {
        match serde_json::to_value(claims) {
            Ok(Value::Object(map)) => self.issue_claims(map),
            Ok(_) => Err(IdentityGateError::TokenGenerationError(
                "claims did not serialize to an object".to_string(),
            )),
            Err(e) => Err(IdentityGateError::TokenGenerationError(e.to_string())),
        }
    }

    /// Issues a token for an arbitrary claim object. Caller values for the
    /// registered claims this issuer owns are discarded, whatever their type.
    pub fn issue_claims(&self, mut claims: Map<String, Value>) -> Result<String, IdentityGateError> {
        let now = self.clock.unix_seconds();
        for owned in ["iss", "aud", "iat", "exp"] {
            claims.remove(owned);
        }
        claims.insert("iss".to_string(), Value::from(self.config.issuer.clone()));
        claims.insert("aud".to_string(), Value::from(self.config.audience.clone()));
        claims.insert("iat".to_string(), Value::from(now));
        if let Some(ttl) = self.config.token_ttl_seconds {
            let exp = now.checked_add(ttl).ok_or_else(|| {
                IdentityGateError::TokenGenerationError(format!("token lifetime of {}s overflows", ttl))
            })?;
            claims.insert("exp".to_string(), Value::from(exp));
        }

        let mut header = Header::new(self.keys.algorithm());
        header.kid = Some(self.keys.kid().to_string());
        tracing::debug!(kid = %self.keys.kid(), sub = ?claims.get("sub"), "Issuing identity token.");

        encode(&header, &claims, self.keys.encoding_key())
            .map_err(|e| IdentityGateError::TokenGenerationError(e.to_string()))
    }

    /// Returns the public verification document. Pure derivation from the
    /// loaded public key.
    pub fn publish_verification_document(&self) -> JsonWebKeySet {
        self.keys.verification_document()
    }

    /// Verifies a token directly against the local public key, bypassing any
    /// remote key cache. Checks the signature (and `exp` if present) but not
    /// issuer or audience.
    pub fn verify_locally(&self, token: &str) -> Result<TokenData<IdentityClaims>, IdentityGateError> {
        self.verify_locally_as(token)
    }

    /// Like [`Generator::verify_locally`], decoding the payload into any claim type.
    pub fn verify_locally_as<T: DeserializeOwned>(&self, token: &str) -> Result<TokenData<T>, IdentityGateError> {
        let mut validation = Validation::new(self.keys.algorithm());
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;

        decode::<T>(token, self.keys.decoding_key(), &validation).map_err(IdentityGateError::from_jwt)
    }
}
