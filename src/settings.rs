// src/settings.rs

//! Process settings for the two binaries, read from environment variables.

use crate::config::{Config, ConfigBuilder};
use crate::error::IdentityGateError;
use crate::generator::key_store::SigningKeyConfig;
use crate::generator::GeneratorConfig;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ISSUER: &str = "com.example.issuer";
pub const DEFAULT_AUDIENCE: &str = "com.example.audience";

fn parse_var<T: FromStr>(vars: &HashMap<String, String>, name: &str) -> Result<Option<T>, IdentityGateError> {
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| IdentityGateError::InvalidConfiguration(format!("{} has invalid value '{}'", name, raw))),
        None => Ok(None),
    }
}

fn string_var(vars: &HashMap<String, String>, name: &str, default: &str) -> String {
    vars.get(name).cloned().unwrap_or_else(|| default.to_string())
}

/// Settings for the token issuer process.
#[derive(Debug, Clone)]
pub struct IssuerSettings {
    pub bind_address: String,
    pub generator: GeneratorConfig,
}

impl IssuerSettings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self, IdentityGateError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load settings from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, IdentityGateError> {
        let algorithm = match vars.get("SIGNING_ALGORITHM") {
            Some(raw) => Algorithm::from_str(raw.trim()).map_err(|_| {
                IdentityGateError::InvalidConfiguration(format!("SIGNING_ALGORITHM has invalid value '{}'", raw))
            })?,
            None => Algorithm::RS256,
        };

        let generator = GeneratorConfig {
            issuer: string_var(vars, "TOKEN_ISSUER", DEFAULT_ISSUER),
            audience: string_var(vars, "TOKEN_AUDIENCE", DEFAULT_AUDIENCE),
            algorithm,
            token_ttl_seconds: parse_var(vars, "TOKEN_TTL_SECONDS")?,
            signing_key: SigningKeyConfig {
                private_key_path: PathBuf::from(string_var(vars, "ISSUER_PRIVATE_KEY_PATH", "./privatekey.pem")),
                public_key_path: vars.get("ISSUER_PUBLIC_KEY_PATH").map(PathBuf::from),
            },
        };

        Ok(Self {
            bind_address: string_var(vars, "ISSUER_BIND_ADDRESS", "0.0.0.0:4005"),
            generator,
        })
    }
}

/// Settings for the verification gateway process.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub bind_address: String,
    pub validator: Config,
}

impl GatewaySettings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self, IdentityGateError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load settings from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, IdentityGateError> {
        let jwks_endpoint = vars
            .get("JWKS_ENDPOINT")
            .ok_or_else(|| IdentityGateError::MissingConfiguration("JWKS_ENDPOINT".to_string()))?;

        let mut builder = ConfigBuilder::new()
            .issuer(string_var(vars, "TOKEN_ISSUER", DEFAULT_ISSUER))
            .audience(string_var(vars, "TOKEN_AUDIENCE", DEFAULT_AUDIENCE))
            .jwks_uri(jwks_endpoint)?;

        if let Some(ms) = parse_var::<u64>(vars, "JWKS_FETCH_TIMEOUT_MS")? {
            builder = builder.fetch_timeout(Duration::from_millis(ms));
        }
        if let Some(secs) = parse_var::<u64>(vars, "TOKEN_LEEWAY_SECONDS")? {
            builder = builder.leeway(Duration::from_secs(secs));
        }
        if let Some(require) = parse_var::<bool>(vars, "REQUIRE_EXPIRATION")? {
            builder = builder.require_expiration(require);
        }

        Ok(Self {
            bind_address: string_var(vars, "GATEWAY_BIND_ADDRESS", "0.0.0.0:4000"),
            validator: builder.build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_defaults() {
        let settings = IssuerSettings::from_vars(&HashMap::new()).expect("Settings should load");
        assert_eq!(settings.bind_address, "0.0.0.0:4005");
        assert_eq!(settings.generator.issuer, DEFAULT_ISSUER);
        assert_eq!(settings.generator.audience, DEFAULT_AUDIENCE);
        assert_eq!(settings.generator.algorithm, Algorithm::RS256);
        assert_eq!(settings.generator.token_ttl_seconds, None);
        assert_eq!(
            settings.generator.signing_key.private_key_path,
            PathBuf::from("./privatekey.pem")
        );
        assert!(settings.generator.signing_key.public_key_path.is_none());
    }

    #[test]
    fn test_issuer_overrides() {
        let vars = HashMap::from([
            ("ISSUER_BIND_ADDRESS".to_string(), "127.0.0.1:9005".to_string()),
            ("TOKEN_ISSUER".to_string(), "issuer.test".to_string()),
            ("SIGNING_ALGORITHM".to_string(), "PS256".to_string()),
            ("TOKEN_TTL_SECONDS".to_string(), "7200".to_string()),
            ("ISSUER_PUBLIC_KEY_PATH".to_string(), "/keys/pub.pem".to_string()),
        ]);
        let settings = IssuerSettings::from_vars(&vars).expect("Settings should load");
        assert_eq!(settings.bind_address, "127.0.0.1:9005");
        assert_eq!(settings.generator.issuer, "issuer.test");
        assert_eq!(settings.generator.algorithm, Algorithm::PS256);
        assert_eq!(settings.generator.token_ttl_seconds, Some(7200));
        assert_eq!(
            settings.generator.signing_key.public_key_path,
            Some(PathBuf::from("/keys/pub.pem"))
        );
    }

    #[test]
    fn test_issuer_invalid_values() {
        let vars = HashMap::from([("TOKEN_TTL_SECONDS".to_string(), "soon".to_string())]);
        assert!(matches!(
            IssuerSettings::from_vars(&vars),
            Err(IdentityGateError::InvalidConfiguration(msg)) if msg.contains("TOKEN_TTL_SECONDS")
        ));

        let vars = HashMap::from([("SIGNING_ALGORITHM".to_string(), "XX999".to_string())]);
        assert!(matches!(
            IssuerSettings::from_vars(&vars),
            Err(IdentityGateError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_gateway_requires_jwks_endpoint() {
        let result = GatewaySettings::from_vars(&HashMap::new());
        assert!(matches!(result, Err(IdentityGateError::MissingConfiguration(v)) if v == "JWKS_ENDPOINT"));
    }

    #[test]
    fn test_gateway_settings() {
        let vars = HashMap::from([
            (
                "JWKS_ENDPOINT".to_string(),
                "http://localhost:4005/.well-known/jwks".to_string(),
            ),
            ("JWKS_FETCH_TIMEOUT_MS".to_string(), "750".to_string()),
            ("REQUIRE_EXPIRATION".to_string(), "true".to_string()),
        ]);
        let settings = GatewaySettings::from_vars(&vars).expect("Settings should load");
        assert_eq!(settings.bind_address, "0.0.0.0:4000");
        assert_eq!(settings.validator.issuer, DEFAULT_ISSUER);
        assert_eq!(settings.validator.audience, DEFAULT_AUDIENCE);
        assert_eq!(settings.validator.fetch_timeout, Duration::from_millis(750));
        assert!(settings.validator.validation.require_expiration);
        assert_eq!(settings.validator.validation.leeway, Duration::from_secs(60));
    }

    #[test]
    fn test_gateway_invalid_endpoint() {
        let vars = HashMap::from([("JWKS_ENDPOINT".to_string(), "not a url".to_string())]);
        assert!(matches!(
            GatewaySettings::from_vars(&vars),
            Err(IdentityGateError::InvalidUrl(_))
        ));
    }
}
