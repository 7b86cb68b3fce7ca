use crate::error::IdentityGateError;
use crate::model::{JsonWebKey, JsonWebKeySet};
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Where the issuer's RSA keypair lives on disk.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SigningKeyConfig {
    /// Path to a PKCS#8 PEM-encoded RSA private key.
    pub private_key_path: PathBuf,
    /// Optional path to the matching SPKI PEM public key. When given, it must
    /// match the private key.
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,
}

/// Holds the signing keypair and everything derived from its public half.
///
/// The private key never leaves this struct; only the encoding key built from it
/// is used for signing.
pub struct KeyStore {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_jwk: JsonWebKey,
}

fn is_rsa_algorithm(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

impl KeyStore {
    /// Reads the keypair from the files named in `config`.
    pub fn load(config: &SigningKeyConfig, algorithm: Algorithm) -> Result<Self, IdentityGateError> {
        let private_pem = std::fs::read_to_string(&config.private_key_path).map_err(|e| {
            IdentityGateError::KeyLoadFailure(format!(
                "Failed to read RSA private key file from {:?}: {}",
                config.private_key_path, e
            ))
        })?;
        let public_pem = match &config.public_key_path {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
                IdentityGateError::KeyLoadFailure(format!(
                    "Failed to read RSA public key file from {:?}: {}",
                    path, e
                ))
            })?),
            None => None,
        };
        Self::from_pem(&private_pem, public_pem.as_deref(), algorithm)
    }

    /// Builds the store from PEM text.
    pub fn from_pem(
        private_pem: &str,
        public_pem: Option<&str>,
        algorithm: Algorithm,
    ) -> Result<Self, IdentityGateError> {
        if !is_rsa_algorithm(algorithm) {
            return Err(IdentityGateError::KeyLoadFailure(format!(
                "{:?} is not an RSA signing algorithm",
                algorithm
            )));
        }

        let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem).map_err(|e| {
            IdentityGateError::KeyLoadFailure(format!(
                "Failed to parse RSA private key from PKCS#8 PEM: {}",
                e
            ))
        })?;
        let public_key = private_key.to_public_key();

        if let Some(pem) = public_pem {
            let supplied = RsaPublicKey::from_public_key_pem(pem).map_err(|e| {
                IdentityGateError::KeyLoadFailure(format!(
                    "Failed to parse RSA public key from SPKI PEM: {}",
                    e
                ))
            })?;
            if supplied != public_key {
                return Err(IdentityGateError::KeyLoadFailure(
                    "Public key does not match the private key".to_string(),
                ));
            }
        }

        // jsonwebtoken signs from PKCS#1 DER.
        let pkcs1_der = private_key.to_pkcs1_der().map_err(|e| {
            IdentityGateError::KeyLoadFailure(format!("Failed to convert RSA key to PKCS#1 DER: {}", e))
        })?;
        let encoding_key = EncodingKey::from_rsa_der(pkcs1_der.as_bytes());

        let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
        let decoding_key = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|err| IdentityGateError::KeyLoadFailure(err.to_string()))?;

        let public_jwk = JsonWebKey {
            kty: "RSA".to_string(),
            kid: thumbprint(&n, &e),
            use_purpose: Some("sig".to_string()),
            alg: Some(format!("{:?}", algorithm)),
            n: Some(n),
            e: Some(e),
        };

        tracing::info!(kid = %public_jwk.kid, alg = ?algorithm, "Signing key loaded.");

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            public_jwk,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The key identifier stamped into every token header.
    pub fn kid(&self) -> &str {
        &self.public_jwk.kid
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// The verification document for the current public key.
    pub fn verification_document(&self) -> JsonWebKeySet {
        JsonWebKeySet {
            keys: vec![self.public_jwk.clone()],
        }
    }
}

/// RFC 7638 JWK thumbprint: SHA-256 over the canonical `{e, kty, n}` member set.
fn thumbprint(n: &str, e: &str) -> String {
    let canonical = format!(r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#, e, n);
    let digest = Sha256::digest(canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
