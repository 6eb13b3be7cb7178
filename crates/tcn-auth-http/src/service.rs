//! The verifying gateway as a hyper `Service`.
//!
//! [`GatewayService`] runs every request through the same pipeline:
//!
//! 1. Health check interception (`GET /health` by default, never signed)
//! 2. TCN signature verification
//! 3. Request body collection
//! 4. Dispatch to the [`AuthenticatedHandler`]
//! 5. Common response headers (`x-request-id`, `Server`)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;
use http::header::{HeaderValue, SERVER};
use http_body_util::BodyExt;
use hyper::service::Service;
use tcn_auth::Verifier;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::body::GatewayBody;
use crate::handler::{AuthenticatedHandler, AuthenticatedRequest};
use crate::response::{ErrorBody, auth_error_response, json_response};

/// Header carrying the per-request identifier.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Default path of the unsigned health endpoint.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Configuration for the gateway service.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Verifier applied to every non-health request.
    pub verifier: Verifier,
    /// Path answered without authentication on `GET`.
    pub health_path: String,
}

impl GatewayConfig {
    /// Configuration with the default health path.
    #[must_use]
    pub fn new(verifier: Verifier) -> Self {
        Self {
            verifier,
            health_path: DEFAULT_HEALTH_PATH.to_owned(),
        }
    }
}

/// hyper service that verifies TCN signatures before invoking a handler.
#[derive(Debug)]
pub struct GatewayService<H: AuthenticatedHandler> {
    handler: Arc<H>,
    config: Arc<GatewayConfig>,
}

impl<H: AuthenticatedHandler> GatewayService<H> {
    /// Create a new gateway service.
    #[must_use]
    pub fn new(handler: H, config: GatewayConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config: Arc::new(config),
        }
    }
}

impl<H: AuthenticatedHandler> Clone for GatewayService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H, B> Service<http::Request<B>> for GatewayService<H>
where
    H: AuthenticatedHandler,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: std::fmt::Display + Send,
{
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response = process_request(req, handler.as_ref(), &config, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    config: &GatewayConfig,
    request_id: &str,
) -> http::Response<GatewayBody>
where
    H: AuthenticatedHandler,
    B: http_body::Body + Send,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();
    debug!(method = %parts.method, uri = %parts.uri, request_id, "processing request");

    if is_health_check(&parts.method, parts.uri.path(), &config.health_path) {
        return health_check_response();
    }

    let identity = match config.verifier.verify(&parts) {
        Ok(identity) => identity,
        Err(err) => {
            warn!(
                method = %parts.method,
                path = parts.uri.path(),
                error = %err,
                request_id,
                "authentication failed"
            );
            return auth_error_response(
                &err,
                &config.verifier.config().service_marker,
                request_id,
            );
        }
    };

    info!(
        api_token = %identity.api_token,
        method = %parts.method,
        path = parts.uri.path(),
        request_id,
        "request authenticated"
    );

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            error!(error = %err, request_id, "failed to collect request body");
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorBody {
                    error: "bad_request",
                    reason: None,
                    message: "Failed to read request body".to_owned(),
                    request_id: request_id.to_owned(),
                },
            );
        }
    };

    handler
        .handle(AuthenticatedRequest {
            identity,
            parts,
            body,
        })
        .await
}

fn is_health_check(method: &http::Method, path: &str, health_path: &str) -> bool {
    *method == http::Method::GET && path == health_path
}

fn health_check_response() -> http::Response<GatewayBody> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({"status": "running", "service": "tcn-auth"}),
    )
}

fn add_common_headers(
    mut response: http::Response<GatewayBody>,
    request_id: &str,
) -> http::Response<GatewayBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert(X_REQUEST_ID, hv);
    }
    headers.insert(SERVER, HeaderValue::from_static("tcn-auth-gateway"));
    response
}
