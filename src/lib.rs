// src/lib.rs

pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod generator;
pub mod model;
pub mod server;
pub mod settings;
pub mod validator;

/// The public prelude for the `identity-gate` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::claims::{IdentityClaims, IdentityContext};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::{Config, ConfigBuilder};
    pub use crate::error::IdentityGateError;
    pub use crate::gateway::{Gateway, GatewayOutcome};
    pub use crate::generator::key_store::{KeyStore, SigningKeyConfig};
    pub use crate::generator::{Generator, GeneratorConfig};
    pub use crate::model::{JsonWebKey, JsonWebKeySet};
    pub use crate::validator::client::{JwksClient, KeySetSource, RemoteKeyEntry};
    pub use crate::validator::Validator;
    pub use jsonwebtoken::Algorithm;
}
