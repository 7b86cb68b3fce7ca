// src/validator/client.rs

use crate::clock::{Clock, SystemClock};
use crate::error::IdentityGateError;
use crate::model::{JsonWebKey, JsonWebKeySet};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use moka::future::Cache;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Somewhere a verification document can be fetched from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JsonWebKeySet, IdentityGateError>;
}

/// Fetches the verification document over HTTP.
pub struct HttpKeySetSource {
    http_client: reqwest::Client,
    jwks_uri: Url,
}

impl HttpKeySetSource {
    pub fn new(jwks_uri: Url, timeout: Duration) -> Result<Self, IdentityGateError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityGateError::InvalidConfiguration(format!("HTTP client: {}", e)))?;
        Ok(Self { http_client, jwks_uri })
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JsonWebKeySet, IdentityGateError> {
        debug!(url = %self.jwks_uri, "Fetching JWKS.");
        let response = self
            .http_client
            .get(self.jwks_uri.clone())
            .send()
            .await
            .map_err(|e| IdentityGateError::NetworkFetchFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityGateError::NetworkFetchFailure(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<JsonWebKeySet>()
            .await
            .map_err(|e| IdentityGateError::NetworkFetchFailure(format!("malformed JWKS: {}", e)))
    }
}

/// A cached verification key.
#[derive(Clone)]
pub struct RemoteKeyEntry {
    pub key: Arc<DecodingKey>,
    /// The algorithm the key is published for, if the document named one.
    pub algorithm: Option<Algorithm>,
    pub fetched_at: SystemTime,
}

impl RemoteKeyEntry {
    fn from_jwk(jwk: &JsonWebKey, fetched_at: SystemTime) -> Result<Self, String> {
        if jwk.kty != "RSA" {
            return Err(format!("unsupported key type '{}'", jwk.kty));
        }
        let n = jwk.n.as_deref().ok_or("RSA key missing 'n' component")?;
        let e = jwk.e.as_deref().ok_or("RSA key missing 'e' component")?;
        let key = DecodingKey::from_rsa_components(n, e).map_err(|err| err.to_string())?;
        let algorithm = match jwk.alg.as_deref() {
            Some(alg) => Some(Algorithm::from_str(alg).map_err(|_| format!("unknown alg '{}'", alg))?),
            None => None,
        };
        Ok(Self {
            key: Arc::new(key),
            algorithm,
            fetched_at,
        })
    }
}

/// A client for fetching and caching the issuer's verification keys.
///
/// Keys are held in memory by `kid` and never expire on time alone. A lookup
/// for an unseen `kid` fetches the whole document once, replaces the cached
/// key set with it and retries the lookup. Concurrent misses on the same `kid`
/// share one fetch; misses on different `kid`s proceed independently.
#[derive(Clone)]
pub struct JwksClient {
    // The client is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn KeySetSource>,
    clock: Arc<dyn Clock>,
    fetch_timeout: Duration,
    // Cache stores `kid` -> key.
    key_cache: Cache<String, RemoteKeyEntry>,
}

impl JwksClient {
    /// Creates a client that fetches from `jwks_uri` over HTTP.
    pub fn new(jwks_uri: Url, fetch_timeout: Duration, capacity: u64) -> Result<Self, IdentityGateError> {
        let source = HttpKeySetSource::new(jwks_uri, fetch_timeout)?;
        Ok(Self::with_source(
            Arc::new(source),
            Arc::new(SystemClock),
            fetch_timeout,
            capacity,
        ))
    }

    /// Creates a client around an arbitrary key source and clock.
    pub fn with_source(
        source: Arc<dyn KeySetSource>,
        clock: Arc<dyn Clock>,
        fetch_timeout: Duration,
        capacity: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                clock,
                fetch_timeout,
                key_cache: Cache::new(capacity),
            }),
        }
    }

    /// Resolves the verification key for `kid`.
    ///
    /// # Errors
    ///
    /// `UnknownSigningKey` if the refreshed document still lacks `kid`;
    /// `NetworkFetchFailure` if the document cannot be fetched in time or parsed.
    #[instrument(skip(self), err)]
    pub async fn resolve_key(&self, kid: &str) -> Result<RemoteKeyEntry, IdentityGateError> {
        if let Some(entry) = self.inner.key_cache.get(kid).await {
            debug!("JWK cache hit for kid: {}", kid);
            return Ok(entry);
        }

        debug!("JWK cache miss for kid: {}. Fetching from issuer.", kid);
        self.inner
            .key_cache
            .try_get_with(kid.to_string(), self.refresh_for(kid))
            .await
            .map_err(|e| (*e).clone())
    }

    /// Number of keys currently cached.
    pub async fn cached_key_count(&self) -> u64 {
        self.inner.key_cache.run_pending_tasks().await;
        self.inner.key_cache.entry_count()
    }

    /// Fetches the document, replaces the cached key set with it, and returns the
    /// entry for `kid`. The entry for `kid` itself is inserted by the caller's
    /// `try_get_with`.
    async fn refresh_for(&self, kid: &str) -> Result<RemoteKeyEntry, IdentityGateError> {
        let key_set = match tokio::time::timeout(self.inner.fetch_timeout, self.inner.source.fetch()).await {
            Ok(Ok(key_set)) => key_set,
            Ok(Err(e)) => {
                warn!(error = %e, "JWKS fetch failed.");
                return Err(e);
            }
            Err(_) => {
                warn!(timeout = ?self.inner.fetch_timeout, "JWKS fetch timed out.");
                return Err(IdentityGateError::NetworkFetchFailure(format!(
                    "JWKS fetch exceeded {:?}",
                    self.inner.fetch_timeout
                )));
            }
        };

        let fetched_at = self.inner.clock.now();
        let mut published = HashSet::new();
        let mut wanted = None;

        for jwk in &key_set.keys {
            let entry = match RemoteKeyEntry::from_jwk(jwk, fetched_at) {
                Ok(entry) => entry,
                Err(reason) => {
                    warn!(kid = %jwk.kid, %reason, "Skipping unusable JWK.");
                    continue;
                }
            };
            published.insert(jwk.kid.clone());
            if jwk.kid == kid {
                wanted = Some(entry);
            } else {
                self.inner.key_cache.insert(jwk.kid.clone(), entry).await;
            }
        }

        let stale: Vec<Arc<String>> = self
            .inner
            .key_cache
            .iter()
            .filter(|(cached_kid, _)| !published.contains(cached_kid.as_str()))
            .map(|(cached_kid, _)| cached_kid)
            .collect();
        for cached_kid in stale {
            debug!(kid = %cached_kid, "Evicting key no longer published.");
            self.inner.key_cache.invalidate(cached_kid.as_str()).await;
        }

        info!("JWKS refreshed with {} usable keys.", published.len());
        wanted.ok_or_else(|| IdentityGateError::UnknownSigningKey(kid.to_string()))
    }
}
