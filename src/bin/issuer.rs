use identity_gate::generator::Generator;
use identity_gate::server::{issuer, shutdown_signal};
use identity_gate::settings::IssuerSettings;
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

    let settings = IssuerSettings::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // A key that cannot be loaded is fatal: the issuer never serves traffic without one.
    let generator = Generator::new(settings.generator).map_err(|e| {
        error!("Failed to initialize signing key: {}", e);
        e
    })?;
    info!(kid = %generator.kid(), "Signing key ready");

    let addr: SocketAddr = settings.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let app = issuer::build_routes(Arc::new(generator));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("JWKS service running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
