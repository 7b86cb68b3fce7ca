use identity_gate::gateway::Gateway;
use identity_gate::server::{gateway, shutdown_signal};
use identity_gate::settings::GatewaySettings;
use identity_gate::validator::Validator;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = GatewaySettings::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    info!(jwks_uri = %settings.validator.jwks_uri, "Configuration loaded");

    let validator = Validator::new(settings.validator)?;

    let addr: SocketAddr = settings.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let app = gateway::build_routes(Arc::new(Gateway::new(validator)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Auth gateway running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
