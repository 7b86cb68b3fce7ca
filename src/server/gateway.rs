use crate::claims::strip_identity;
use crate::gateway::{Gateway, GatewayOutcome};
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::instrument;
use uuid::Uuid;

/// Builds the gateway router: any method at `/` answers `{"ok": true}` once
/// the request has passed the gateway.
pub fn build_routes(gateway: Arc<Gateway>) -> Router {
    protect(Router::new().route("/", any(root)), gateway).layer(TraceLayer::new_for_http())
}

/// Puts every route of `downstream` behind the gateway.
///
/// Client-supplied identity headers are always removed. On a verified request
/// the identity is written into the request headers and extensions before the
/// downstream handler runs, and copied onto the response.
pub fn protect(downstream: Router, gateway: Arc<Gateway>) -> Router {
    downstream.route_layer(middleware::from_fn_with_state(gateway, authenticate))
}

#[instrument(name = "gateway.request", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn authenticate(State(gateway): State<Arc<Gateway>>, mut req: Request, next: Next) -> Response {
    strip_identity(req.headers_mut());

    let outcome = gateway.evaluate(req.method(), req.headers()).await;
    match outcome {
        GatewayOutcome::Bypass => next.run(req).await,
        GatewayOutcome::Verified(identity) => {
            identity.propagate(req.headers_mut());
            req.extensions_mut().insert(identity.clone());
            let mut response = next.run(req).await;
            identity.propagate(response.headers_mut());
            response
        }
        rejected => rejected.status_code().into_response(),
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "ok": true }))
}
