use crate::error::IdentityGateError;
use crate::generator::Generator;
use crate::model::JsonWebKeySet;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{instrument, warn};

/// Body of `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub jwt: String,
}

/// Response of `POST /verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub payload: Map<String, Value>,
}

/// Builds the issuer router:
/// - `GET /.well-known/jwks` - the verification document
/// - `POST /login` - mint a token for the posted claims
/// - `POST /verify` - verify a token against the local public key
pub fn build_routes(generator: Arc<Generator>) -> Router {
    Router::new()
        .route("/.well-known/jwks", get(get_jwks))
        .route("/login", post(login))
        .route("/verify", post(verify))
        .layer(TraceLayer::new_for_http())
        .with_state(generator)
}

async fn get_jwks(State(generator): State<Arc<Generator>>) -> Json<JsonWebKeySet> {
    Json(generator.publish_verification_document())
}

/// Any JSON object is accepted as the claim set. A body that is not one gets
/// a bare 400; the parse error is only logged.
#[instrument(name = "issuer.login", skip_all)]
async fn login(
    State(generator): State<Arc<Generator>>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    let Json(claims) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejecting login body.");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match generator.issue_claims(claims) {
        Ok(token) => token.into_response(),
        Err(e) => {
            warn!(error = %e, "Token issuance failed.");
            e.into_response()
        }
    }
}

#[instrument(name = "issuer.verify", skip_all)]
async fn verify(
    State(generator): State<Arc<Generator>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, IdentityGateError> {
    match generator.verify_locally_as::<Map<String, Value>>(&request.jwt) {
        Ok(data) => Ok(Json(VerifyResponse { payload: data.claims })),
        Err(e) => {
            warn!(error = %e, "Local verification failed.");
            Err(e)
        }
    }
}
