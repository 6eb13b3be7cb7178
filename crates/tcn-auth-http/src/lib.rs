//! HTTP gateway that verifies TCN-signed requests.
//!
//! - **Service** ([`service`]): [`GatewayService`](service::GatewayService), a
//!   hyper `Service` that verifies every request before handing it on.
//! - **Handlers** ([`handler`]): the [`AuthenticatedHandler`](handler::AuthenticatedHandler)
//!   trait and the [`EchoHandler`](handler::EchoHandler) used by the gateway binary.
//! - **Responses** ([`response`]): JSON error bodies and status mapping.
//! - **Body** ([`body`]): the [`GatewayBody`](body::GatewayBody) response body.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> GatewayService (hyper Service)
//!     -> Health check interception
//!     -> Verifier (Authorization + X-Timestamp)
//!     -> Body collection
//!     -> AuthenticatedHandler
//!     -> Common response headers (x-request-id, Server)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tcn_auth::{StaticCredentialProvider, Verifier, VerifierConfig};
//! use tcn_auth_http::{EchoHandler, GatewayConfig, GatewayService};
//!
//! let provider =
//!     StaticCredentialProvider::new(vec![("client-a".to_owned(), "s3cr3t".to_owned())])
//!         .unwrap();
//! let verifier = Verifier::new(Arc::new(provider), VerifierConfig::default());
//! let service = GatewayService::new(EchoHandler, GatewayConfig::new(verifier));
//! // Serve `service` with hyper.
//! ```

pub mod body;
pub mod handler;
pub mod response;
pub mod service;

pub use body::GatewayBody;
pub use handler::{AuthenticatedHandler, AuthenticatedRequest, EchoHandler, EchoReply};
pub use service::{GatewayConfig, GatewayService};
