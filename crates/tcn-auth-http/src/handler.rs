//! Handlers invoked after a request has been verified.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use tcn_auth::VerifiedRequest;

use crate::body::GatewayBody;
use crate::response::json_response;

/// A request that passed signature verification.
#[derive(Debug)]
pub struct AuthenticatedRequest {
    /// Who signed the request, and when.
    pub identity: VerifiedRequest,
    /// Method, URI and headers as received.
    pub parts: http::request::Parts,
    /// The collected request body.
    pub body: Bytes,
}

/// Business logic behind the verifying gateway.
pub trait AuthenticatedHandler: Send + Sync + 'static {
    /// Produce a response for a verified request.
    fn handle(
        &self,
        request: AuthenticatedRequest,
    ) -> Pin<Box<dyn Future<Output = http::Response<GatewayBody>> + Send>>;
}

/// Replies with a JSON description of the verified request.
///
/// JSON request bodies are echoed back under `body`; anything else is
/// reported as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

/// Response document of [`EchoHandler`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoReply {
    /// The API token that signed the request.
    pub api_token: String,
    /// Request method.
    pub method: String,
    /// Request path as received.
    pub path: String,
    /// The signed timestamp.
    pub timestamp: String,
    /// The request body, if it was JSON.
    pub body: serde_json::Value,
}

impl AuthenticatedHandler for EchoHandler {
    fn handle(
        &self,
        request: AuthenticatedRequest,
    ) -> Pin<Box<dyn Future<Output = http::Response<GatewayBody>> + Send>> {
        Box::pin(async move {
            let body = serde_json::from_slice(&request.body).unwrap_or(serde_json::Value::Null);
            let reply = EchoReply {
                api_token: request.identity.api_token,
                method: request.parts.method.to_string(),
                path: request.parts.uri.path().to_owned(),
                timestamp: request.identity.timestamp.as_str().to_owned(),
                body,
            };
            json_response(StatusCode::OK, &reply)
        })
    }
}
