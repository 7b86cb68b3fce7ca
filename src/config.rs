// src/config.rs

use crate::error::IdentityGateError;
use jsonwebtoken::Algorithm;
use std::time::Duration;
use url::Url;

/// Default bound on a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Default maximum number of cached verification keys.
pub const DEFAULT_CACHE_CAPACITY: u64 = 100;

/// Contains the validation settings for an identity token.
///
/// This struct is used to configure the specific checks that will be performed
/// on the token's claims, such as allowed algorithms and clock skew tolerance.
#[derive(Clone, Debug)]
pub struct ValidationDetails {
    /// The signing algorithms that are permitted.
    /// Tokens signed with any other algorithm will be rejected.
    pub algorithms: Vec<Algorithm>,
    /// The tolerance for clock skew when validating `exp`.
    /// Defaults to 60 seconds.
    pub leeway: Duration,
    /// Whether tokens without an `exp` claim are rejected. An `exp` that is
    /// present is always enforced.
    pub require_expiration: bool,
}

impl Default for ValidationDetails {
    fn default() -> Self {
        Self {
            algorithms: vec![Algorithm::RS256],
            leeway: Duration::from_secs(60),
            require_expiration: false,
        }
    }
}

/// Configuration for the gateway-side token validator.
///
/// It should be constructed using the `ConfigBuilder`.
#[derive(Clone, Debug)]
pub struct Config {
    /// Expected `iss` claim, matched exactly.
    pub issuer: String,
    /// Expected `aud` claim, matched exactly.
    pub audience: String,
    /// Where the issuer publishes its verification document.
    pub jwks_uri: Url,
    /// The specific validation parameters to apply to the token.
    pub validation: ValidationDetails,
    /// Upper bound on one verification-document fetch.
    pub fetch_timeout: Duration,
    /// Maximum number of keys held by the remote key cache.
    pub cache_capacity: u64,
}

/// A builder for creating a `Config` instance.
#[derive(Default)]
pub struct ConfigBuilder {
    issuer: Option<String>,
    audience: Option<String>,
    jwks_uri: Option<Url>,
    fetch_timeout: Option<Duration>,
    cache_capacity: Option<u64>,
    validation: ValidationDetails,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected issuer. This is a required field.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the expected audience. This is a required field.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the verification document endpoint. This is a required field.
    pub fn jwks_uri(mut self, url: &str) -> Result<Self, IdentityGateError> {
        let parsed_url = Url::parse(url).map_err(|e| IdentityGateError::InvalidUrl(e.to_string()))?;
        self.jwks_uri = Some(parsed_url);
        Ok(self)
    }

    /// Sets the allowed signing algorithms.
    /// Defaults to `[Algorithm::RS256]` if not set.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.validation.algorithms = algorithms;
        self
    }

    /// Sets the clock skew tolerance. Defaults to 60 seconds.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.validation.leeway = leeway;
        self
    }

    /// Rejects tokens that carry no `exp` claim.
    pub fn require_expiration(mut self, require: bool) -> Self {
        self.validation.require_expiration = require;
        self
    }

    /// Bounds each fetch of the verification document. Defaults to 5 seconds.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns an error if `issuer`, `audience` or `jwks_uri` is missing, or if
    /// the algorithm list or fetch timeout is empty.
    pub fn build(self) -> Result<Config, IdentityGateError> {
        let issuer = self
            .issuer
            .ok_or(IdentityGateError::MissingConfiguration("issuer".to_string()))?;
        let audience = self
            .audience
            .ok_or(IdentityGateError::MissingConfiguration("audience".to_string()))?;
        let jwks_uri = self
            .jwks_uri
            .ok_or(IdentityGateError::MissingConfiguration("jwks_uri".to_string()))?;

        if self.validation.algorithms.is_empty() {
            return Err(IdentityGateError::InvalidConfiguration(
                "at least one algorithm must be allowed".to_string(),
            ));
        }
        let fetch_timeout = self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT);
        if fetch_timeout.is_zero() {
            return Err(IdentityGateError::InvalidConfiguration(
                "fetch_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            issuer,
            audience,
            jwks_uri,
            validation: self.validation,
            fetch_timeout,
            cache_capacity: self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        })
    }
}
