// src/validator.rs

pub mod client;

use crate::claims::IdentityClaims;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::IdentityGateError;
use client::{JwksClient, KeySetSource};
use jsonwebtoken::{decode, decode_header, TokenData, Validation};
use std::sync::Arc;
use tracing::instrument;

/// Verifies bearer tokens against the issuer's published keys.
///
/// This struct is initialized with a `Config` and should be created once
/// and reused for all validation requests. It owns the remote key cache.
#[derive(Clone)]
pub struct Validator {
    config: Config,
    jwks_client: JwksClient,
}

impl Validator {
    /// Creates a new `Validator` fetching keys from `config.jwks_uri` over HTTP.
    pub fn new(config: Config) -> Result<Self, IdentityGateError> {
        let jwks_client = JwksClient::new(
            config.jwks_uri.clone(),
            config.fetch_timeout,
            config.cache_capacity,
        )?;
        Ok(Self { config, jwks_client })
    }

    /// Creates a `Validator` whose keys come from `source`.
    pub fn with_key_source(config: Config, source: Arc<dyn KeySetSource>, clock: Arc<dyn Clock>) -> Self {
        let jwks_client =
            JwksClient::with_source(source, clock, config.fetch_timeout, config.cache_capacity);
        Self { config, jwks_client }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn jwks_client(&self) -> &JwksClient {
        &self.jwks_client
    }

    /// Validates an identity token.
    ///
    /// This method performs, in order:
    /// 1. Header parsing and the algorithm allow-list check.
    /// 2. Key resolution by `kid` through the remote key cache.
    /// 3. Signature verification against the resolved key.
    /// 4. Exact `iss` and `aud` matching, plus `exp` per the expiration policy.
    #[instrument(skip(self, token), err)]
    pub async fn validate(&self, token: &str) -> Result<TokenData<IdentityClaims>, IdentityGateError> {
        let header = decode_header(token).map_err(|e| IdentityGateError::MalformedToken(e.to_string()))?;

        if !self.config.validation.algorithms.contains(&header.alg) {
            return Err(IdentityGateError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header.kid.ok_or(IdentityGateError::MissingKeyId)?;
        let entry = self.jwks_client.resolve_key(&kid).await?;

        if let Some(published_alg) = entry.algorithm {
            if published_alg != header.alg {
                return Err(IdentityGateError::UnsupportedAlgorithm(format!(
                    "key {} is published for {:?}, token uses {:?}",
                    kid, published_alg, header.alg
                )));
            }
        }

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.config.validation.leeway.as_secs();
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        let mut required = vec!["iss", "aud"];
        if self.config.validation.require_expiration {
            required.push("exp");
        }
        validation.set_required_spec_claims(&required);

        decode::<IdentityClaims>(token, &entry.key, &validation).map_err(IdentityGateError::from_jwt)
    }
}
